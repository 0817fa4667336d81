use serde::{Deserialize, Serialize};

/// A LINE user who followed the bot. The user id is the record's unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: String,
}

impl Recipient {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
