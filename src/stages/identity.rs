//! Identity stage - instance validation and name resolution
//!
//! The resolved name ends up in snapshot names, descriptions, and tags, so it
//! is restricted to `[A-Za-z0-9-]`. Instances whose sanitized names collide
//! are not disambiguated; the snapshot tags still carry the instance id.

use tracing::{debug, info};

use crate::ec2::Ec2Api;
use crate::{InstanceIdentity, PrepatchError};

/// Confirm the instance exists before anything mutating happens
pub async fn validate(
    ec2: &dyn Ec2Api,
    identity: &InstanceIdentity,
) -> Result<(), PrepatchError> {
    ec2.validate_instance(&identity.instance_id).await?;
    debug!(
        "Instance {} confirmed in {}",
        identity.instance_id, identity.region
    );
    Ok(())
}

/// Resolve the instance's display name from its `Name` tag
///
/// Falls back to the raw instance id when the tag is absent.
pub async fn resolve_name(
    ec2: &dyn Ec2Api,
    identity: &InstanceIdentity,
) -> Result<String, PrepatchError> {
    let name = match ec2.name_tag(&identity.instance_id).await? {
        Some(tag) => sanitize_name(&tag),
        None => identity.instance_id.clone(),
    };

    // An all-symbol tag sanitizes to nothing; fall back rather than emit
    // snapshot names with an empty leading segment.
    let name = if name.is_empty() {
        identity.instance_id.clone()
    } else {
        name
    };

    info!("Instance name: {}", name);
    Ok(name)
}

/// Reduce a tag value to the character class `[A-Za-z0-9-]`
///
/// Spaces become hyphens first so multi-word names stay readable.
pub fn sanitize_name(raw: &str) -> String {
    raw.replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec2::mock::MockEc2;

    fn identity() -> InstanceIdentity {
        InstanceIdentity {
            instance_id: "i-0abc123def4567890".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn sanitize_passes_clean_names_through() {
        assert_eq!(sanitize_name("web1"), "web1");
        assert_eq!(sanitize_name("Web-Server-01"), "Web-Server-01");
    }

    #[test]
    fn sanitize_replaces_spaces_with_hyphens() {
        assert_eq!(sanitize_name("web server 1"), "web-server-1");
    }

    #[test]
    fn sanitize_strips_everything_outside_the_class() {
        assert_eq!(sanitize_name("web_server.1!"), "webserver1");
        assert_eq!(sanitize_name("app (prod) #2"), "app-prod-2");
    }

    #[test]
    fn sanitize_output_stays_in_character_class() {
        let sanitized = sanitize_name("héllo wörld / 42");
        assert!(sanitized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert!(!sanitized.is_empty());
    }

    #[tokio::test]
    async fn missing_name_tag_falls_back_to_instance_id() {
        let ec2 = MockEc2::new();
        let name = resolve_name(&ec2, &identity()).await.unwrap();
        assert_eq!(name, "i-0abc123def4567890");
    }

    #[tokio::test]
    async fn tagged_instance_uses_sanitized_tag() {
        let ec2 = MockEc2::new().with_instance_name("web server #1");
        let name = resolve_name(&ec2, &identity()).await.unwrap();
        assert_eq!(name, "web-server-1");
    }

    #[tokio::test]
    async fn all_symbol_tag_falls_back_to_instance_id() {
        let ec2 = MockEc2::new().with_instance_name("!!!");
        let name = resolve_name(&ec2, &identity()).await.unwrap();
        assert_eq!(name, "i-0abc123def4567890");
    }
}
