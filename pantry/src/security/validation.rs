// This file is part of the product Pantry.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use validator::ValidateEmail;

pub const MAX_EMAIL_CHARS: usize = 255;
pub const MAX_NAME_CHARS: usize = 255;
pub const MIN_PASSWORD_CHARS: usize = 5;
pub const MAX_PASSWORD_CHARS: usize = 1024;

/// Canonical form used for storage and lookup: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate user email input
pub fn validate_email_field(email: &str) -> Result<(), String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err("Email is required".to_string());
    }
    if trimmed.chars().count() > MAX_EMAIL_CHARS {
        return Err(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_CHARS
        ));
    }
    if !trimmed.validate_email() {
        return Err("Email format is invalid".to_string());
    }
    Ok(())
}

pub fn validate_password_field(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_CHARS {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        ));
    }
    if len > MAX_PASSWORD_CHARS {
        return Err(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_CHARS
        ));
    }
    Ok(())
}

/// Validate and sanitize user names for display safety
/// Allows letters, numbers, spaces, apostrophes, hyphens, and periods
/// Replaces invalid characters with spaces and collapses multiple spaces
pub fn validate_and_sanitize_user_name(name: &str) -> Result<String, String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    let sanitized = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '\'' || c == '-' || c == '.' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>();

    let sanitized = sanitized
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");

    let sanitized_len = sanitized.chars().count();
    if !(1..=MAX_NAME_CHARS).contains(&sanitized_len) {
        return Err(format!(
            "Name must be between 1 and {} characters",
            MAX_NAME_CHARS
        ));
    }

    Ok(sanitized)
}

/// Trimmed, non-empty text of at most `max_chars` characters.
pub fn validate_text_field(label: &str, value: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} may not be blank", label));
    }
    if trimmed.chars().count() > max_chars {
        return Err(format!(
            "{} must be at most {} characters",
            label, max_chars
        ));
    }
    Ok(trimmed.to_string())
}
