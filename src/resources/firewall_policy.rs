//! `fortios_firewall_policy`: IPv4 firewall policies, keyed by `policyid`.

use crate::firmware::FirmwareVersion;
use crate::resource::{ResourceDefinition, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock};

/// Releases before this one send `poolname` as a quoted, space-separated
/// string.
pub const POOLNAME_TABLE_SINCE: FirmwareVersion = FirmwareVersion::new(6, 2, 0);

/// Firewall policy definition.
pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        "fortios_firewall_policy",
        "FirewallPolicy",
        "firewall/policy",
        ResourceKind::Table { mkey: "policyid" },
        block(),
    )
}

fn block() -> Block {
    Block::new()
        .with_description("Configure IPv4 policies.")
        .with_attribute(
            "policyid",
            Attribute::optional_computed_int64().with_range(0, 4_294_967_294),
        )
        .with_attribute("name", Attribute::optional_string().with_length(0, 35))
        .with_attribute("uuid", Attribute::optional_computed_string())
        .with_attribute("status", Attribute::toggle())
        .with_attribute(
            "action",
            Attribute::optional_computed_string().with_one_of(&["accept", "deny", "ipsec"]),
        )
        .with_attribute("schedule", Attribute::optional_computed_string().with_length(0, 35))
        .with_attribute("nat", Attribute::toggle())
        .with_attribute("ippool", Attribute::toggle())
        .with_attribute(
            "logtraffic",
            Attribute::optional_computed_string().with_one_of(&["all", "utm", "disable"]),
        )
        .with_attribute("logtraffic_start", Attribute::toggle())
        .with_attribute(
            "inspection_mode",
            Attribute::optional_computed_string().with_one_of(&["proxy", "flow"]),
        )
        .with_attribute("utm_status", Attribute::toggle())
        .with_attribute("av_profile", Attribute::optional_string().with_length(0, 35))
        .with_attribute("webfilter_profile", Attribute::optional_string().with_length(0, 35))
        .with_attribute("ips_sensor", Attribute::optional_string().with_length(0, 35))
        .with_attribute("ssl_ssh_profile", Attribute::optional_computed_string().with_length(0, 35))
        .with_attribute("comments", Attribute::optional_string().with_length(0, 1023))
        .with_block("srcintf", name_table(79))
        .with_block("dstintf", name_table(79))
        .with_block("srcaddr", name_table(79))
        .with_block("dstaddr", name_table(79))
        .with_block("service", name_table(79))
        .with_block("groups", name_table(79))
        .with_block("users", name_table(79))
        .with_block(
            "poolname",
            name_table(79).space_separated_before(POOLNAME_TABLE_SINCE, "name"),
        )
}

fn name_table(max_len: usize) -> NestedBlock {
    NestedBlock::set(
        Block::new().with_attribute(
            "name",
            Attribute::optional_computed_string().with_length(0, max_len),
        ),
    )
    .sorted_by("name")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::OperationContext;
    use crate::testing::MemoryClient;
    use serde_json::json;

    fn policy() -> serde_json::Value {
        json!({
            "name": "allow-web",
            "action": "accept",
            "srcintf": [{"name": "port2"}],
            "dstintf": [{"name": "port1"}],
            "srcaddr": [{"name": "all"}],
            "dstaddr": [{"name": "all"}],
            "service": [{"name": "HTTPS"}, {"name": "HTTP"}],
            "schedule": "always",
            "nat": "enable",
            "poolname": [{"name": "pool-b"}, {"name": "pool-a"}]
        })
    }

    #[tokio::test]
    async fn test_policy_on_current_firmware() {
        let client = MemoryClient::new().with_mkey_field("firewall/policy", "policyid");
        let op = OperationContext {
            firmware: Some(FirmwareVersion::new(7, 2, 4)),
            ..Default::default()
        };

        let state = definition().create(&client, op, &policy()).await.unwrap();
        assert_eq!(state["id"], "1");
        assert_eq!(state["policyid"], 1);
        assert_eq!(state["service"], json!([{"name": "HTTP"}, {"name": "HTTPS"}]));
        assert_eq!(
            client.object("firewall/policy", Some("1")).unwrap()["poolname"],
            json!([{"name": "pool-b"}, {"name": "pool-a"}])
        );
    }

    #[tokio::test]
    async fn test_poolname_on_old_firmware() {
        let client = MemoryClient::new().with_mkey_field("firewall/policy", "policyid");
        let op = OperationContext {
            firmware: Some(FirmwareVersion::new(6, 0, 12)),
            ..Default::default()
        };

        let state = definition().create(&client, op, &policy()).await.unwrap();
        assert_eq!(
            client.object("firewall/policy", Some("1")).unwrap()["poolname"],
            "\"pool-b\" \"pool-a\""
        );
        assert_eq!(
            state["poolname"],
            json!([{"name": "pool-a"}, {"name": "pool-b"}])
        );
    }

    #[test]
    fn test_duplicate_set_entries_are_rejected() {
        let diagnostics = definition().validate(&json!({
            "service": [{"name": "HTTP"}, {"name": "HTTP"}]
        }));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
    }
}
