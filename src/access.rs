// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 The verba-ledger authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Capability provider seam.
//!
//! The coordinator asks this trait which operations a caller may invoke;
//! how roles are computed (sessions, claims, org charts) lives outside the
//! core.

use crate::base::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
    Viewer,
}

/// Boolean capability flags per user, supplied by the host application.
pub trait Capabilities: Send + Sync {
    fn role(&self, user: UserId) -> Role;

    fn can_create(&self, user: UserId) -> bool;

    fn can_edit(&self, user: UserId) -> bool;

    fn can_delete(&self, user: UserId) -> bool;

    fn is_admin(&self, user: UserId) -> bool {
        self.role(user) == Role::Admin
    }
}

/// Grants everything to everyone. For tests and the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Capabilities for AllowAll {
    fn role(&self, _user: UserId) -> Role {
        Role::Admin
    }

    fn can_create(&self, _user: UserId) -> bool {
        true
    }

    fn can_edit(&self, _user: UserId) -> bool {
        true
    }

    fn can_delete(&self, _user: UserId) -> bool {
        true
    }
}
