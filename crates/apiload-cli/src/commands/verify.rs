use std::io::{self, Write};
use std::process::ExitCode;

use apiload_core::config::Settings;
use apiload_core::verify::{KeyStatus, KeyVerifier};
use clap::Args;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Read keys from the environment (always the fallback; kept for compatibility)
    #[arg(long)]
    pub use_env: bool,

    /// OpenAI API key to check instead of OPENAI_API_KEY
    #[arg(long)]
    pub openai_key: Option<String>,

    /// Hugging Face API key to check instead of HF_API_KEY
    #[arg(long)]
    pub hf_key: Option<String>,
}

pub async fn execute(args: VerifyArgs) -> anyhow::Result<ExitCode> {
    let settings = Settings::from_env().with_key_overrides(args.openai_key, args.hf_key);
    let verifier = KeyVerifier::new(&settings)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "\n=== API Key Verification ===\n")?;

    writeln!(out, "Testing OpenAI API key...")?;
    let openai = verifier
        .verify_openai(settings.openai_api_key.as_deref())
        .await;
    print_status(&mut out, "OpenAI", &openai)?;
    writeln!(out)?;

    writeln!(out, "Testing Hugging Face API key...")?;
    let hf = verifier
        .verify_huggingface(settings.hf_api_key.as_deref())
        .await;
    print_status(&mut out, "Hugging Face", &hf)?;

    writeln!(out, "\n=== Summary ===")?;
    writeln!(out, "OpenAI API: {}", verdict(&openai))?;
    writeln!(out, "Hugging Face API: {}", verdict(&hf))?;

    if openai.is_valid() {
        writeln!(out, "\n✅ All necessary API keys are valid! You can run the load tests.")?;
        Ok(ExitCode::SUCCESS)
    } else {
        writeln!(out, "\n⚠️ OpenAI API key is invalid. Please update it in the .env file.")?;
        Ok(ExitCode::FAILURE)
    }
}

fn print_status<W: Write>(out: &mut W, name: &str, status: &KeyStatus) -> io::Result<()> {
    match status {
        KeyStatus::Valid => writeln!(out, "✅ {name} API key is valid!"),
        KeyStatus::NotSet => writeln!(out, "❌ {name} API key is not set"),
        KeyStatus::Invalid { details } => {
            writeln!(out, "❌ {name} API key error")?;
            writeln!(out, "Error details: {details}")
        }
        KeyStatus::RequestFailed { message } => {
            writeln!(out, "❌ {name} API request failed: {message}")
        }
    }
}

fn verdict(status: &KeyStatus) -> &'static str {
    if status.is_valid() {
        "✅ Valid"
    } else {
        "❌ Invalid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(status: &KeyStatus) -> String {
        let mut buf = Vec::new();
        print_status(&mut buf, "OpenAI", status).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn status_lines() {
        assert_eq!(render(&KeyStatus::Valid), "✅ OpenAI API key is valid!\n");
        assert_eq!(render(&KeyStatus::NotSet), "❌ OpenAI API key is not set\n");
        assert_eq!(
            render(&KeyStatus::Invalid {
                details: "{\"error\"".to_string()
            }),
            "❌ OpenAI API key error\nError details: {\"error\"\n"
        );
    }

    #[test]
    fn only_valid_is_valid() {
        assert_eq!(verdict(&KeyStatus::Valid), "✅ Valid");
        assert_eq!(verdict(&KeyStatus::NotSet), "❌ Invalid");
    }
}
