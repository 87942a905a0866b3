//! Member directory lookups.
//!
//! Member records are owned by the host application; the loan engine only
//! asks whether an id refers to a known member.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn is_known_member(&self, member_id: &str) -> Result<bool>;
}

/// Accepts any non-blank member id.
#[derive(Debug, Clone, Default)]
pub struct OpenMemberDirectory;

#[async_trait]
impl MemberDirectory for OpenMemberDirectory {
    async fn is_known_member(&self, member_id: &str) -> Result<bool> {
        Ok(!member_id.trim().is_empty())
    }
}

/// Fixed list of member ids, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticMemberDirectory {
    members: HashSet<String>,
}

impl StaticMemberDirectory {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl MemberDirectory for StaticMemberDirectory {
    async fn is_known_member(&self, member_id: &str) -> Result<bool> {
        Ok(self.members.contains(member_id))
    }
}
