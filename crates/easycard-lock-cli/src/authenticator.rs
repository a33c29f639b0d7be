//! Terminal stand-in for the platform biometric prompt

use async_trait::async_trait;
use clap::ValueEnum;
use easycard_lock::platform::{
    Assertion, AssertionRequest, BiometricKind, CreatedCredential, CredentialCreationRequest,
    PlatformAuthenticator, PlatformError,
};
use easycard_lock::security::generate_challenge;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::Mutex;

type LineSource = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

/// Line reader shared by the shell and the biometric prompt
#[derive(Clone)]
pub struct TerminalInput {
    lines: Arc<Mutex<LineSource>>,
}

impl TerminalInput {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Arc::new(Mutex::new(reader.lines())),
        }
    }

    /// Next line, `None` at end of input
    pub async fn next_line(&self) -> std::io::Result<Option<String>> {
        self.lines.lock().await.next_line().await
    }
}

/// How biometric ceremonies are answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BiometricMode {
    /// Ask on the terminal
    Prompt,
    /// Always approve
    Approve,
    /// Always decline
    Decline,
    /// Report no authenticator
    Unavailable,
}

/// Answers ceremonies according to a [`BiometricMode`].
///
/// Any credential the store presents is accepted, since a terminal has no
/// platform registry to check it against.
pub struct TerminalAuthenticator {
    mode: BiometricMode,
    input: TerminalInput,
}

impl TerminalAuthenticator {
    pub fn new(mode: BiometricMode, input: TerminalInput) -> Self {
        Self { mode, input }
    }

    async fn approve(&self, action: &str) -> Result<(), PlatformError> {
        match self.mode {
            BiometricMode::Approve => Ok(()),
            BiometricMode::Decline => Err(PlatformError::NotAllowed),
            BiometricMode::Unavailable => Err(PlatformError::NotAvailable),
            BiometricMode::Prompt => {
                let mut stdout = std::io::stdout();
                write!(stdout, "Approve biometric {}? [y/N] ", action)
                    .and_then(|_| stdout.flush())
                    .map_err(|e| PlatformError::Other(e.to_string()))?;

                let answer = self
                    .input
                    .next_line()
                    .await
                    .map_err(|e| PlatformError::Other(e.to_string()))?;
                match answer {
                    Some(answer) if is_affirmative(&answer) => Ok(()),
                    _ => Err(PlatformError::NotAllowed),
                }
            }
        }
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "yes")
}

#[async_trait]
impl PlatformAuthenticator for TerminalAuthenticator {
    async fn is_user_verifying_available(&self) -> Result<bool, PlatformError> {
        Ok(self.mode != BiometricMode::Unavailable)
    }

    async fn create_credential(
        &self,
        request: &CredentialCreationRequest,
    ) -> Result<Option<CreatedCredential>, PlatformError> {
        self.approve(&format!("enrollment for {}", request.relying_party.name))
            .await?;
        Ok(Some(CreatedCredential {
            raw_id: generate_challenge().to_vec(),
        }))
    }

    async fn get_assertion(
        &self,
        request: &AssertionRequest,
    ) -> Result<Option<Assertion>, PlatformError> {
        self.approve("verification").await?;
        Ok(request.allow_credentials.first().map(|allowed| Assertion {
            credential_id: allowed.id.clone(),
        }))
    }

    fn biometric_kind(&self) -> BiometricKind {
        BiometricKind::Generic
    }
}
