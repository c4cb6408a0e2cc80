use crate::{
    errors::{Error, Result},
    models::{meetme::Meetme, user::Principal},
};

/// What the caller is with respect to one meetme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Owner,
    Admin,
    Stranger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    ReadMessages,
    PostUserMessage,
    PostAdminMessage,
    SetStatus,
    Delete,
    /// Cross-owner views of the admin panel.
    Administer,
}

pub trait PermissionChecker {
    fn capability(&self, meetme: &Meetme) -> Capability;
    fn can(&self, action: Action, meetme: Option<&Meetme>) -> bool;

    fn check_permission(&self, action: Action, meetme: Option<&Meetme>) -> Result<()> {
        if self.can(action, meetme) {
            Ok(())
        } else {
            Err(Error::Forbidden(denial_message(action)))
        }
    }
}

impl PermissionChecker for Principal {
    fn capability(&self, meetme: &Meetme) -> Capability {
        // ownership wins so an admin replying to their own meetme acts as its owner
        if meetme.owner_id == self.user_id {
            Capability::Owner
        } else if self.is_admin {
            Capability::Admin
        } else {
            Capability::Stranger
        }
    }

    fn can(&self, action: Action, meetme: Option<&Meetme>) -> bool {
        match action {
            Action::Create => true,
            Action::PostAdminMessage | Action::SetStatus | Action::Delete | Action::Administer => {
                self.is_admin
            }
            Action::Read | Action::ReadMessages => meetme.is_some_and(|m| {
                matches!(self.capability(m), Capability::Owner | Capability::Admin)
            }),
            Action::PostUserMessage => {
                meetme.is_some_and(|m| self.capability(m) == Capability::Owner)
            }
        }
    }
}

fn denial_message(action: Action) -> String {
    match action {
        Action::PostAdminMessage | Action::SetStatus | Action::Delete | Action::Administer => {
            "Admin access required"
        }
        _ => "Access denied",
    }
    .to_string()
}
