use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// OpenAI Chat Completions message object.
    #[must_use]
    pub fn to_openai_value(&self) -> Value {
        serde_json::json!({ "role": self.role.as_str(), "content": self.content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_shape() {
        let v = ConversationTurn::user("Sakura: hi").to_openai_value();
        assert_eq!(v["role"], "user");
        assert_eq!(v["content"], "Sakura: hi");
        assert_eq!(
            ConversationTurn::system("x").to_openai_value()["role"],
            "system"
        );
    }
}
