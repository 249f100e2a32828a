//! Email-domain restriction.
//!
//! After the token exchange the gate may require that the account's email
//! belongs to one domain. The check asks the provider's profile endpoint
//! with the freshly minted bearer client; any failure along the way denies.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::oauth::{AuthenticatedClient, ensure_success};

/// Profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub email: String,
}

/// Fetches the profile of the user behind `client`.
///
/// # Errors
///
/// Returns [`Error::Http`] on network failure or a malformed body, or
/// [`Error::OAuth`] on a non-success status.
pub async fn fetch_profile(client: &AuthenticatedClient, profile_url: &Url) -> Result<Profile, Error> {
    let response = client.get(profile_url.clone()).send().await?;
    let response = ensure_success(response, "profile request").await?;
    response.json::<Profile>().await.map_err(Into::into)
}

/// Returns true if `email` has exactly one `@` and the part after it is `domain`.
#[must_use]
pub fn email_in_domain(email: &str, domain: &str) -> bool {
    let mut parts = email.split('@');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(_), Some(found), None) if found == domain
    )
}

/// Checks that the authenticated user's email is in `required_domain`.
///
/// Single attempt; a network error, an error status, an unreadable profile
/// or a foreign domain all deny.
pub async fn domain_allowed(
    client: &AuthenticatedClient,
    profile_url: &Url,
    required_domain: &str,
) -> bool {
    let profile = match fetch_profile(client, profile_url).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "Profile lookup failed");
            return false;
        }
    };

    if email_in_domain(&profile.email, required_domain) {
        true
    } else {
        tracing::warn!(
            email_domain = email_domain(&profile.email).unwrap_or("<none>"),
            required_domain,
            "Email outside required domain"
        );
        false
    }
}

/// The part after the last `@`, if any.
fn email_domain(email: &str) -> Option<&str> {
    email.rsplit_once('@').map(|(_, domain)| domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_domain() {
        assert!(email_in_domain("alice@example.com", "example.com"));
    }

    #[test]
    fn rejects_other_domain() {
        assert!(!email_in_domain("alice@example.org", "example.com"));
        assert!(!email_in_domain("alice@sub.example.com", "example.com"));
    }

    #[test]
    fn rejects_missing_or_extra_at() {
        assert!(!email_in_domain("alice.example.com", "example.com"));
        assert!(!email_in_domain("", "example.com"));
        assert!(!email_in_domain("a@b@example.com", "example.com"));
    }

    #[test]
    fn email_domain_is_part_after_last_at() {
        assert_eq!(email_domain("eve@other.org"), Some("other.org"));
        assert_eq!(email_domain("a@b@other.org"), Some("other.org"));
        assert_eq!(email_domain("no-at-sign"), None);
    }

    #[test]
    fn profile_tolerates_missing_fields() {
        let profile: Profile = serde_json::from_str(r#"{"email":"bob@example.com"}"#).unwrap();
        assert_eq!(profile.email, "bob@example.com");
        assert!(profile.id.is_empty());
    }

    #[test]
    fn profile_reads_google_field_names() {
        let profile: Profile = serde_json::from_str(
            r#"{"id":"1","name":"Bob B","given_name":"Bob","family_name":"B","email":"bob@example.com"}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name, "Bob B");
        assert_eq!(profile.given_name, "Bob");
    }
}
