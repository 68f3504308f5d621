//! `fortios_router_isis`: the per-vdom IS-IS router settings.
//!
//! There is exactly one IS-IS configuration per vdom, so the object is a
//! singleton. Creating it means updating it; destroying it empties its tables.

use crate::resource::{ResourceDefinition, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock};

/// IS-IS definition.
pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        "fortios_router_isis",
        "RouterIsis",
        "router/isis",
        ResourceKind::Singleton { id: "RouterIsis" },
        block(),
    )
}

fn level() -> Attribute {
    Attribute::optional_computed_string().with_one_of(&["level-1-2", "level-1", "level-2"])
}

fn auth_mode() -> Attribute {
    Attribute::optional_computed_string().with_one_of(&["password", "md5"])
}

fn block() -> Block {
    Block::new()
        .with_description("Configure IS-IS.")
        .with_attribute(
            "is_type",
            Attribute::optional_computed_string()
                .with_one_of(&["level-1-2", "level-1", "level-2-only"]),
        )
        .with_attribute("adv_passive_only", Attribute::toggle())
        .with_attribute("adv_passive_only6", Attribute::toggle())
        .with_attribute("auth_mode_l1", auth_mode())
        .with_attribute("auth_mode_l2", auth_mode())
        .with_attribute(
            "auth_password_l1",
            Attribute::optional_string().with_length(0, 128).sensitive(),
        )
        .with_attribute(
            "auth_password_l2",
            Attribute::optional_string().with_length(0, 128).sensitive(),
        )
        .with_attribute("dynamic_hostname", Attribute::toggle())
        .with_attribute("ignore_lsp_errors", Attribute::toggle())
        .with_attribute(
            "lsp_gen_interval_l1",
            Attribute::optional_computed_int64().with_range(1, 120),
        )
        .with_attribute(
            "lsp_gen_interval_l2",
            Attribute::optional_computed_int64().with_range(1, 120),
        )
        .with_attribute(
            "lsp_refresh_interval",
            Attribute::optional_computed_int64().with_range(1, 65535),
        )
        .with_attribute(
            "max_lsp_lifetime",
            Attribute::optional_computed_int64().with_range(350, 65535),
        )
        .with_attribute(
            "metric_style",
            Attribute::optional_computed_string().with_one_of(&[
                "narrow",
                "narrow-transition",
                "narrow-transition-l1",
                "narrow-transition-l2",
                "wide",
                "wide-l1",
                "wide-l2",
                "wide-transition",
                "wide-transition-l1",
                "wide-transition-l2",
                "transition",
                "transition-l1",
                "transition-l2",
            ]),
        )
        .with_attribute("overload_bit", Attribute::toggle())
        .with_attribute("default_originate", Attribute::toggle())
        .with_attribute("redistribute_l1", Attribute::toggle())
        .with_attribute("redistribute_l2", Attribute::toggle())
        .with_block(
            "isis_net",
            NestedBlock::list(
                Block::new()
                    .with_attribute(
                        "id",
                        Attribute::optional_computed_int64().with_range(0, 4_294_967_295),
                    )
                    .with_attribute("net", Attribute::optional_computed_string()),
            )
            .sorted_by("id"),
        )
        .with_block(
            "isis_interface",
            NestedBlock::list(
                Block::new()
                    .with_attribute("name", Attribute::optional_computed_string().with_length(0, 15))
                    .with_attribute("status", Attribute::toggle())
                    .with_attribute("status6", Attribute::toggle())
                    .with_attribute(
                        "network_type",
                        Attribute::optional_computed_string()
                            .with_one_of(&["broadcast", "point-to-point", "loopback"]),
                    )
                    .with_attribute("circuit_type", level())
                    .with_attribute("csnp_interval_l1", Attribute::optional_computed_int64().with_range(1, 65535))
                    .with_attribute("csnp_interval_l2", Attribute::optional_computed_int64().with_range(1, 65535))
                    .with_attribute("hello_interval_l1", Attribute::optional_computed_int64().with_range(0, 65535))
                    .with_attribute("hello_interval_l2", Attribute::optional_computed_int64().with_range(0, 65535))
                    .with_attribute("metric_l1", Attribute::optional_computed_int64().with_range(1, 63))
                    .with_attribute("metric_l2", Attribute::optional_computed_int64().with_range(1, 63))
                    .with_attribute("wide_metric_l1", Attribute::optional_computed_int64().with_range(1, 16_777_214))
                    .with_attribute("wide_metric_l2", Attribute::optional_computed_int64().with_range(1, 16_777_214))
                    .with_attribute("priority_l1", Attribute::optional_computed_int64().with_range(0, 127))
                    .with_attribute("priority_l2", Attribute::optional_computed_int64().with_range(0, 127))
                    .with_attribute("auth_mode_l1", auth_mode())
                    .with_attribute(
                        "auth_password_l1",
                        Attribute::optional_string().with_length(0, 128).sensitive(),
                    )
                    .with_attribute("mesh_group", Attribute::toggle())
                    .with_attribute("mesh_group_id", Attribute::optional_computed_int64()),
            )
            .sorted_by("name"),
        )
        .with_block(
            "summary_address",
            NestedBlock::list(
                Block::new()
                    .with_attribute("id", Attribute::optional_computed_int64())
                    .with_attribute("prefix", Attribute::optional_computed_string().ipv4_mask())
                    .with_attribute("level", level()),
            )
            .sorted_by("id"),
        )
        .with_block(
            "redistribute",
            NestedBlock::list(
                Block::new()
                    .with_attribute("protocol", Attribute::optional_computed_string().with_length(0, 35))
                    .with_attribute("status", Attribute::toggle())
                    .with_attribute("metric", Attribute::optional_computed_int64().with_range(0, 4_261_412_864))
                    .with_attribute(
                        "metric_type",
                        Attribute::optional_computed_string().with_one_of(&["external", "internal"]),
                    )
                    .with_attribute("level", level())
                    .with_attribute("routemap", Attribute::optional_computed_string().with_length(0, 35)),
            )
            .sorted_by("protocol"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::OperationContext;
    use crate::testing::MemoryClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_password_is_write_only() {
        let client = MemoryClient::new().with_response_hook(|_, object| {
            if object.contains_key("auth-password-l1") {
                object.insert("auth-password-l1".to_string(), json!("ENC XXXX"));
            }
        });
        let def = definition();

        let state = def
            .create(
                &client,
                OperationContext::default(),
                &json!({
                    "metric_style": "wide",
                    "auth_mode_l1": "md5",
                    "auth_password_l1": "s3cret",
                    "isis_interface": [{"name": "port1", "auth_password_l1": "if-s3cret"}]
                }),
            )
            .await
            .unwrap();

        assert_eq!(state["id"], "RouterIsis");
        assert_eq!(state["auth_password_l1"], "s3cret");
        assert_eq!(state["isis_interface"][0]["auth_password_l1"], "if-s3cret");
        assert_eq!(
            client.object("router/isis", None).unwrap()["auth-password-l1"],
            "s3cret"
        );
    }

    #[tokio::test]
    async fn test_summary_prefix_keeps_notation() {
        let client = MemoryClient::new();
        client.insert(
            "router/isis",
            None,
            json!({"summary-address": [{"id": 1, "prefix": "10.0.0.0 255.0.0.0", "level": "level-2"}]}),
        );
        let def = definition();

        let state = def
            .read(
                &client,
                OperationContext::default(),
                &json!({"id": "RouterIsis", "summary_address": [{"id": 1, "prefix": "10.0.0.0/8"}]}),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state["summary_address"][0]["prefix"], "10.0.0.0/8");
        assert_eq!(state["summary_address"][0]["level"], "level-2");
    }

    #[tokio::test]
    async fn test_read_reversed_tables_keep_their_own_values() {
        let client = MemoryClient::new();
        client.insert(
            "router/isis",
            None,
            json!({
                "isis-interface": [
                    {"name": "port2", "auth-password-l1": "ENC b"},
                    {"name": "port1", "auth-password-l1": "ENC a"}
                ],
                "summary-address": [
                    {"id": 2, "prefix": "10.2.0.0 255.255.0.0"},
                    {"id": 1, "prefix": "10.1.0.0 255.255.255.0"}
                ]
            }),
        );
        let prior = json!({
            "id": "RouterIsis",
            "isis_interface": [
                {"name": "port1", "auth_password_l1": "pw-port1"},
                {"name": "port2", "auth_password_l1": "pw-port2"}
            ],
            "summary_address": [
                {"id": 1, "prefix": "10.1.0.0/24"},
                {"id": 2, "prefix": "10.2.0.0 255.255.0.0"}
            ]
        });

        let state = definition()
            .read(&client, OperationContext::default(), &prior)
            .await
            .unwrap()
            .unwrap();
        let interfaces = state["isis_interface"].as_array().unwrap();
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0]["name"], "port1");
        assert_eq!(interfaces[0]["auth_password_l1"], "pw-port1");
        assert_eq!(interfaces[1]["name"], "port2");
        assert_eq!(interfaces[1]["auth_password_l1"], "pw-port2");

        let summaries = state["summary_address"].as_array().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0]["id"], 1);
        assert_eq!(summaries[0]["prefix"], "10.1.0.0/24");
        assert_eq!(summaries[1]["id"], 2);
        assert_eq!(summaries[1]["prefix"], "10.2.0.0 255.255.0.0");
    }

    #[tokio::test]
    async fn test_import_singleton_without_id() {
        let client = MemoryClient::new();
        client.insert("router/isis", None, json!({"is-type": "level-2-only"}));

        let state = definition()
            .import(&client, OperationContext::default(), "")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state["id"], "RouterIsis");
        assert_eq!(state["is_type"], "level-2-only");
    }
}
