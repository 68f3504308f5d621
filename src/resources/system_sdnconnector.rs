//! `fortios_system_sdnconnector`: connectors to public and private clouds.
//!
//! Several of its tables hold tables of their own (`nic.ip`,
//! `route_table.route`, `external_account_list.region_list`,
//! `gcp_project_list.gcp_zone_list`).

use crate::resource::{ResourceDefinition, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock};

/// SDN connector definition.
pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        "fortios_system_sdnconnector",
        "SystemSdnConnector",
        "system/sdn-connector",
        ResourceKind::Table { mkey: "name" },
        block(),
    )
}

fn name_only(max_len: usize) -> Block {
    Block::new().with_attribute(
        "name",
        Attribute::optional_computed_string().with_length(0, max_len),
    )
}

fn block() -> Block {
    Block::new()
        .with_description("Configure connection to SDN Connector.")
        .with_attribute("name", Attribute::optional_computed_string().with_length(0, 35))
        .with_attribute("status", Attribute::toggle())
        .with_attribute(
            "type",
            Attribute::optional_computed_string().with_one_of(&[
                "aci", "alicloud", "aws", "azure", "gcp", "nsx", "nuage", "oci", "openstack",
                "kubernetes", "vmware", "sepm", "aci-direct", "ibm", "nutanix", "sap",
            ]),
        )
        .with_attribute("ha_status", Attribute::toggle())
        .with_attribute("verify_certificate", Attribute::toggle())
        .with_attribute("server", Attribute::optional_computed_string().with_length(0, 127))
        .with_attribute("server_port", Attribute::optional_computed_int64().with_range(0, 65535))
        .with_attribute("username", Attribute::optional_computed_string().with_length(0, 64))
        .with_attribute("password", Attribute::optional_string().sensitive())
        .with_attribute("access_key", Attribute::optional_computed_string().with_length(0, 31))
        .with_attribute(
            "secret_key",
            Attribute::optional_string().with_length(0, 59).sensitive(),
        )
        .with_attribute("region", Attribute::optional_computed_string().with_length(0, 31))
        .with_attribute("vpc_id", Attribute::optional_computed_string().with_length(0, 31))
        .with_attribute("tenant_id", Attribute::optional_computed_string().with_length(0, 127))
        .with_attribute(
            "subscription_id",
            Attribute::optional_computed_string().with_length(0, 63),
        )
        .with_attribute("resource_group", Attribute::optional_computed_string().with_length(0, 63))
        .with_attribute(
            "azure_region",
            Attribute::optional_computed_string()
                .with_one_of(&["global", "china", "germany", "usgov", "local"]),
        )
        .with_attribute(
            "update_interval",
            Attribute::optional_computed_int64().with_range(0, 3600),
        )
        .with_block("external_ip", NestedBlock::list(name_only(63)).sorted_by("name"))
        .with_block("route", NestedBlock::list(name_only(63)).sorted_by("name"))
        .with_block(
            "nic",
            NestedBlock::list(
                name_only(63).with_block(
                    "ip",
                    NestedBlock::list(
                        name_only(63)
                            .with_attribute(
                                "public_ip",
                                Attribute::optional_computed_string().with_length(0, 63),
                            )
                            .with_attribute(
                                "resource_group",
                                Attribute::optional_computed_string().with_length(0, 63),
                            ),
                    )
                    .sorted_by("name"),
                ),
            )
            .sorted_by("name"),
        )
        .with_block(
            "route_table",
            NestedBlock::list(
                name_only(63)
                    .with_attribute(
                        "subscription_id",
                        Attribute::optional_computed_string().with_length(0, 63),
                    )
                    .with_attribute(
                        "resource_group",
                        Attribute::optional_computed_string().with_length(0, 63),
                    )
                    .with_block(
                        "route",
                        NestedBlock::list(name_only(63).with_attribute(
                            "next_hop",
                            Attribute::optional_computed_string().with_length(0, 127),
                        ))
                        .sorted_by("name"),
                    ),
            )
            .sorted_by("name"),
        )
        .with_block(
            "external_account_list",
            NestedBlock::list(
                Block::new()
                    .with_attribute(
                        "role_arn",
                        Attribute::optional_computed_string().with_length(0, 2047),
                    )
                    .with_attribute(
                        "external_id",
                        Attribute::optional_computed_string().with_length(0, 1399),
                    )
                    .with_block(
                        "region_list",
                        NestedBlock::list(Block::new().with_attribute(
                            "region",
                            Attribute::optional_computed_string().with_length(0, 31),
                        ))
                        .sorted_by("region"),
                    ),
            )
            .sorted_by("role_arn"),
        )
        .with_block(
            "gcp_project_list",
            NestedBlock::list(
                Block::new()
                    .with_attribute("id", Attribute::optional_computed_string().with_length(0, 127))
                    .with_block(
                        "gcp_zone_list",
                        NestedBlock::list(name_only(127)).sorted_by("name"),
                    ),
            )
            .sorted_by("id"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::OperationContext;
    use crate::testing::{assert_state_contains, MemoryClient};
    use serde_json::json;

    #[tokio::test]
    async fn test_nested_tables_round_trip() {
        let client = MemoryClient::new().with_mkey_field("system/sdn-connector", "name");
        let def = definition();
        let op = OperationContext::default();

        let planned = json!({
            "name": "azure1",
            "type": "azure",
            "tenant_id": "tenant",
            "nic": [
                {"name": "nic-b", "ip": [{"name": "ipconfig1", "public_ip": "pip-b"}]},
                {"name": "nic-a", "ip": [
                    {"name": "ipconfig2", "public_ip": "pip-a2"},
                    {"name": "ipconfig1", "public_ip": "pip-a1"}
                ]}
            ],
            "route_table": [{"name": "rt1", "route": [{"name": "default", "next_hop": "10.0.0.4"}]}]
        });
        let state = def.create(&client, op, &planned).await.unwrap();
        assert_eq!(state["id"], "azure1");

        let stored = client.object("system/sdn-connector", Some("azure1")).unwrap();
        assert_eq!(stored["route-table"][0]["route"][0]["next-hop"], "10.0.0.4");
        assert_eq!(stored["nic"][1]["ip"][0]["public-ip"], "pip-a2");

        assert_eq!(state["nic"][0]["name"], "nic-a");
        assert_eq!(
            state["nic"][0]["ip"],
            json!([
                {"name": "ipconfig1", "public_ip": "pip-a1"},
                {"name": "ipconfig2", "public_ip": "pip-a2"}
            ])
        );
        assert_state_contains(&state, &json!({"type": "azure", "tenant_id": "tenant"}));
    }

    #[tokio::test]
    async fn test_update_inner_table_only_changes_that_entry() {
        let client = MemoryClient::new().with_mkey_field("system/sdn-connector", "name");
        let def = definition();
        let op = OperationContext::default();

        let state = def
            .create(
                &client,
                op,
                &json!({
                    "name": "aws1",
                    "type": "aws",
                    "external_account_list": [
                        {"role_arn": "arn:aws:iam::1:role/a", "region_list": [{"region": "us-east-1"}]},
                        {"role_arn": "arn:aws:iam::2:role/b", "region_list": [{"region": "eu-west-1"}]}
                    ]
                }),
            )
            .await
            .unwrap();

        let mut planned = state.clone();
        planned["external_account_list"][1]["region_list"] = json!([{"region": "eu-central-1"}]);
        let updated = def.update(&client, op, &state, &planned).await.unwrap();

        assert_eq!(
            updated["external_account_list"][0],
            state["external_account_list"][0]
        );
        assert_eq!(
            updated["external_account_list"][1]["region_list"],
            json!([{"region": "eu-central-1"}])
        );
        assert_eq!(updated["type"], "aws");
    }

    #[test]
    fn test_secrets_are_sensitive() {
        let def = definition();
        assert!(def.block.attributes["secret_key"].flags.sensitive);
        assert!(def.block.attributes["password"].flags.sensitive);
        assert!(def.block.has_sensitive());
    }
}
