//! Command argument builder.

use serde::Serialize;

use crate::codec::CommandArgs;
use crate::error::{ClientError, ClientResult};

/// Builds ordered command arguments.
///
/// `None` values are kept and sent as explicit JSON `null`. A builder with no
/// arguments yields `None`, which goes out as `"args": null`.
#[derive(Debug, Clone, Default)]
pub struct ArgsBuilder {
    args: CommandArgs,
    error: Option<String>,
}

impl ArgsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`, serializing `value` to JSON.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.args.insert(key.to_string(), value);
            }
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(format!("argument {key}: {e}"));
                }
            }
        }
        self
    }

    /// Adds `key` only when `value` is `Some`.
    #[must_use]
    pub fn with_if_some<T: Serialize>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Finishes the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Encode`] for the first value that failed to
    /// serialize.
    pub fn build(self) -> ClientResult<Option<CommandArgs>> {
        if let Some(e) = self.error {
            return Err(ClientError::Encode(e));
        }
        Ok((!self.args.is_empty()).then_some(self.args))
    }
}
