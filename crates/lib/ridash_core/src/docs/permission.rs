//! Document access resolution.
//!
//! Ownership runs document → folder → team → owner. A request loads one
//! [`DocumentContext`] and asks it every question it has, instead of
//! re-querying per check.

use crate::models::docs::{DocsPermission, DocsShare, Document, Folder, ShareRole, Team};

/// Level of access being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// What granted an access decision, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSource {
    TeamOwner,
    Share(ShareRole),
    Public,
}

/// A document together with its ownership chain and the requester's share.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub document: Document,
    pub folder: Folder,
    pub team: Team,
    /// Share held by the requester this context was loaded for, if any.
    pub share: Option<DocsShare>,
}

impl DocumentContext {
    pub fn owner_id(&self) -> i64 {
        self.team.owner_id
    }

    /// Team owners manage a document: edit metadata, delete, share.
    pub fn is_manager(&self, requester: Option<i64>) -> bool {
        requester == Some(self.owner_id())
    }

    /// Decide `needed` access for `requester` (`None` when anonymous).
    pub fn grant(&self, requester: Option<i64>, needed: Access) -> Option<AccessSource> {
        if self.is_manager(requester) {
            return Some(AccessSource::TeamOwner);
        }

        if let (Some(user_id), Some(share)) = (requester, &self.share)
            && share.user_id == user_id
            && share.document_id == self.document.id
        {
            let sufficient = match needed {
                Access::Read => true,
                Access::Write => share.roles == ShareRole::Write,
            };
            if sufficient {
                return Some(AccessSource::Share(share.roles));
            }
        }

        let public = match (needed, self.document.permission) {
            (_, DocsPermission::PublicWrite) => true,
            (Access::Read, DocsPermission::Public) => true,
            _ => false,
        };
        public.then_some(AccessSource::Public)
    }

    pub fn can_read(&self, requester: Option<i64>) -> bool {
        self.grant(requester, Access::Read).is_some()
    }

    pub fn can_write(&self, requester: Option<i64>) -> bool {
        self.grant(requester, Access::Write).is_some()
    }
}
