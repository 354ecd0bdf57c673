use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of a client, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl ClientDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Trim every field and turn blank optional fields into `None`
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: opt(self.phone),
            company: opt(self.company),
            address: opt(self.address),
            city: opt(self.city),
            country: opt(self.country),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CrmError::Validation("client name is required".into()));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(CrmError::Validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }
        if let Some(phone) = &self.phone {
            if !phone.trim().is_empty() && !is_valid_phone(phone) {
                return Err(CrmError::Validation(format!(
                    "'{}' is not a valid phone number",
                    phone
                )));
            }
        }
        Ok(())
    }
}

impl Client {
    /// Case-insensitive substring match on name, email or company.
    /// `term` must already be lowercased.
    pub fn matches_search(&self, term: &str) -> bool {
        [Some(&self.name), Some(&self.email), self.company.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(term))
    }
}

impl From<&Client> for ClientDraft {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            company: client.company.clone(),
            address: client.address.clone(),
            city: client.city.clone(),
            country: client.country.clone(),
        }
    }
}

/// `local@domain.tld` with a TLD of at least two letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && host_ok && tld_ok
}

/// Optional leading `+`, then 1 to 16 digits not starting with zero.
/// Spaces and dashes are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| *c != ' ' && *c != '-').collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    (1..=16).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientSort {
    #[default]
    Newest,
    Name,
    Id,
}

/// Filter and ordering for listing clients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientQuery {
    /// Case-insensitive match against name, email and company
    pub search: Option<String>,
    pub country: Option<String>,
    pub sort: ClientSort,
}

impl ClientQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Default::default()
        }
    }

    /// Trimmed, lowercased search text, if any
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    pub fn sorted_by(mut self, sort: ClientSort) -> Self {
        self.sort = sort;
        self
    }
}

/// Columns that can appear in a client listing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientColumn {
    Id,
    Name,
    Email,
    Phone,
    Company,
    Address,
    City,
    Country,
    CreatedAt,
}

impl ClientColumn {
    pub const ALL: [ClientColumn; 9] = [
        ClientColumn::Id,
        ClientColumn::Name,
        ClientColumn::Email,
        ClientColumn::Phone,
        ClientColumn::Company,
        ClientColumn::Address,
        ClientColumn::City,
        ClientColumn::Country,
        ClientColumn::CreatedAt,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            ClientColumn::Id => "ID",
            ClientColumn::Name => "Name",
            ClientColumn::Email => "Email",
            ClientColumn::Phone => "Phone",
            ClientColumn::Company => "Company",
            ClientColumn::Address => "Address",
            ClientColumn::City => "City",
            ClientColumn::Country => "Country",
            ClientColumn::CreatedAt => "Registered",
        }
    }

    pub fn value(&self, client: &Client) -> String {
        fn or_na(value: &Option<String>) -> String {
            value.clone().unwrap_or_else(|| "N/A".to_string())
        }

        match self {
            ClientColumn::Id => client.id.to_string(),
            ClientColumn::Name => client.name.clone(),
            ClientColumn::Email => client.email.clone(),
            ClientColumn::Phone => or_na(&client.phone),
            ClientColumn::Company => or_na(&client.company),
            ClientColumn::Address => or_na(&client.address),
            ClientColumn::City => or_na(&client.city),
            ClientColumn::Country => or_na(&client.country),
            ClientColumn::CreatedAt => client.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana example@x.com"));
        assert!(!is_valid_email("ana@@example.com"));
        assert!(!is_valid_email("ana@example.c0m"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("+34 600-123-456"));
        assert!(is_valid_phone("5551234"));
        assert!(!is_valid_phone("0123"));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("12345678901234567"));
        assert!(!is_valid_phone("555-CALL"));
    }

    #[test]
    fn test_normalized_drops_blank_fields() {
        let draft = ClientDraft {
            name: "  Ana ".into(),
            email: "ana@example.com ".into(),
            phone: Some("   ".into()),
            city: Some(" Madrid".into()),
            ..Default::default()
        }
        .normalized();

        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.email, "ana@example.com");
        assert_eq!(draft.phone, None);
        assert_eq!(draft.city.as_deref(), Some("Madrid"));
    }

    #[test]
    fn test_matches_search_ignores_case() {
        let now = Utc::now();
        let client = Client {
            id: 1,
            name: "Íñigo Ruiz".into(),
            email: "inigo@example.com".into(),
            phone: None,
            company: None,
            address: None,
            city: None,
            country: None,
            created_at: now,
            updated_at: now,
        };

        let term = ClientQuery::search("  ÍÑIGO ").search_term().unwrap();
        assert_eq!(term, "íñigo");
        assert!(client.matches_search(&term));
        assert!(client.matches_search("example.com"));
        assert!(!client.matches_search("acme"));
        assert_eq!(ClientQuery::search("   ").search_term(), None);
    }

    #[test]
    fn test_validate_rejects_missing_name() {
        let draft = ClientDraft::new("", "ana@example.com");
        assert!(matches!(draft.validate(), Err(CrmError::Validation(_))));
    }
}
