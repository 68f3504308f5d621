//! `fortios_router_static`: IPv4 static routes, keyed by `seq_num`.

use crate::resource::{ResourceDefinition, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock};

/// Static route definition.
pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        "fortios_router_static",
        "RouterStatic",
        "router/static",
        ResourceKind::Table { mkey: "seq_num" },
        block(),
    )
}

fn block() -> Block {
    Block::new()
        .with_description("Configure IPv4 static routing tables.")
        .with_attribute(
            "seq_num",
            Attribute::optional_computed_int64().with_range(0, 4_294_967_295),
        )
        .with_attribute("status", Attribute::toggle())
        .with_attribute("dst", Attribute::optional_computed_string().ipv4_mask())
        .with_attribute("src", Attribute::optional_computed_string().ipv4_mask())
        .with_attribute("gateway", Attribute::optional_computed_string())
        .with_attribute(
            "distance",
            Attribute::optional_computed_int64().with_range(1, 255),
        )
        .with_attribute("weight", Attribute::optional_computed_int64().with_range(0, 255))
        .with_attribute(
            "priority",
            Attribute::optional_computed_int64().with_range(0, 65535),
        )
        .with_attribute("device", Attribute::optional_computed_string().with_length(0, 35))
        .with_attribute("comment", Attribute::optional_string().with_length(0, 255))
        .with_attribute("blackhole", Attribute::toggle())
        .with_attribute("dynamic_gateway", Attribute::toggle())
        .with_attribute("dstaddr", Attribute::optional_computed_string().with_length(0, 79))
        .with_attribute(
            "internet_service",
            Attribute::optional_computed_int64().with_range(0, 4_294_967_295),
        )
        .with_attribute(
            "internet_service_custom",
            Attribute::optional_computed_string().with_length(0, 64),
        )
        .with_attribute("link_monitor_exempt", Attribute::toggle())
        .with_attribute("vrf", Attribute::optional_computed_int64().with_range(0, 31))
        .with_attribute("bfd", Attribute::toggle())
        .with_block(
            "sdwan_zone",
            NestedBlock::list(
                Block::new().with_attribute(
                    "name",
                    Attribute::optional_computed_string().with_length(0, 79),
                ),
            )
            .sorted_by("name"),
        )
}
