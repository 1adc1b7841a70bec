// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network address classification and normalization.

/// Suffix of one-to-one user chats.
pub const USER_SUFFIX: &str = "@s.whatsapp.net";
/// Suffix of group chats.
pub const GROUP_SUFFIX: &str = "@g.us";
/// Suffix of broadcast lists and status updates.
pub const BROADCAST_SUFFIX: &str = "@broadcast";

pub fn is_group(address: &str) -> bool {
    address.ends_with(GROUP_SUFFIX)
}

pub fn is_broadcast(address: &str) -> bool {
    address.ends_with(BROADCAST_SUFFIX)
}

/// Whether messages in this chat count toward analytics.
pub fn is_trackable(address: &str) -> bool {
    !is_group(address) && !is_broadcast(address)
}

/// Turn user input into a full network address.
///
/// Full addresses pass through unchanged. A bare phone number (digits, with
/// optional `+`, spaces, dashes, dots, or parentheses) becomes a user address.
/// Returns `None` for anything else.
pub fn normalize_address(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('@') {
        return Some(trimmed.to_string());
    }

    let mut digits = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '+' | ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits}{USER_SUFFIX}"))
}
