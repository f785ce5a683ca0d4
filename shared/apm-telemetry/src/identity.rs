//! Session identity stamped on every outgoing payload

use std::sync::Arc;

use crate::event::Context;
use crate::item::TelemetryItem;
use crate::sink::BeforeSend;

pub const USER_ID_KEY: &str = "userId";
pub const USER_NAME_KEY: &str = "userName";
pub const USER_EMAIL_KEY: &str = "userEmail";

/// Identity fields merged into the context of every payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
}

impl Default for IdentityContext {
    /// The demo's fixed test user.
    fn default() -> Self {
        Self::new("001", "Jack O'Neill", "jack.oneill@sgc.com")
    }
}

impl IdentityContext {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            user_email: user_email.into(),
        }
    }

    /// Add the identity fields to `context`.
    ///
    /// Other caller keys are kept; identity keys always carry the session's values.
    pub fn merge_into(&self, context: &mut Context) {
        context.insert(USER_ID_KEY.to_string(), self.user_id.as_str().into());
        context.insert(USER_NAME_KEY.to_string(), self.user_name.as_str().into());
        context.insert(USER_EMAIL_KEY.to_string(), self.user_email.as_str().into());
    }

    /// Pre-send hook that enriches every item with this identity.
    pub fn into_before_send(self) -> BeforeSend {
        Arc::new(move |mut item: TelemetryItem| {
            self.merge_into(item.context_mut());
            Some(item)
        })
    }
}
