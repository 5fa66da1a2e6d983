//! Input and output guards combined.

use serde::Serialize;

use crate::config::GuardrailsConfig;
use crate::workflow::ResolutionEnvelope;

use super::{GuardVerdict, GuardrailError, InputGuard, OutputGuard};

/// Replacement text for answers the output guard rejects.
pub const BLOCKED_RESPONSE: &str = "Response blocked by safety guardrails.";

/// A screened answer: the verdict plus the text safe to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenedResponse {
    pub verdict: GuardVerdict,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    input: InputGuard,
    output: OutputGuard,
}

impl Gateway {
    /// Build both guards from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::InvalidPattern` if a pattern fails to compile.
    pub fn from_config(config: &GuardrailsConfig) -> Result<Self, GuardrailError> {
        Ok(Self {
            input: InputGuard::from_config(config)?,
            output: OutputGuard::new()?,
        })
    }

    #[must_use]
    pub fn input(&self) -> &InputGuard {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &OutputGuard {
        &self.output
    }

    #[must_use]
    pub fn screen_question(&self, question: &str) -> GuardVerdict {
        self.input.validate(question)
    }

    /// Validate a response, then sanitize it or replace it when blocked.
    #[must_use]
    pub fn screen_response(&self, response: &str) -> ScreenedResponse {
        let verdict = self.output.validate(response);
        let response = if verdict.is_rejected() {
            BLOCKED_RESPONSE.to_string()
        } else {
            self.output.sanitize(response)
        };
        ScreenedResponse { verdict, response }
    }

    /// Screen the final answer of an envelope in place.
    #[must_use]
    pub fn screen_envelope(
        &self,
        mut envelope: ResolutionEnvelope,
    ) -> (ResolutionEnvelope, GuardVerdict) {
        let screened = self.screen_response(&envelope.final_answer);
        envelope.final_answer = screened.response;
        (envelope, screened.verdict)
    }
}
