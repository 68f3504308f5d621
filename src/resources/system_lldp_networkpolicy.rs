//! `fortios_system_lldp_networkpolicy`: LLDP-MED network policies.
//!
//! Each application type is a single nested block. The device exchanges it
//! as a bare object; state holds it as a one-element list.

use crate::resource::{ResourceDefinition, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock};

const APPLICATIONS: [&str; 8] = [
    "voice",
    "voice_signaling",
    "guest",
    "guest_voice_signaling",
    "softphone",
    "video_conferencing",
    "streaming_video",
    "video_signaling",
];

/// LLDP network policy definition.
pub fn definition() -> ResourceDefinition {
    ResourceDefinition::new(
        "fortios_system_lldp_networkpolicy",
        "SystemLldpNetworkPolicy",
        "system.lldp/network-policy",
        ResourceKind::Table { mkey: "name" },
        block(),
    )
}

fn application() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute("status", Attribute::toggle())
            .with_attribute(
                "tag",
                Attribute::optional_computed_string().with_one_of(&["none", "dot1q", "dot1p"]),
            )
            .with_attribute("vlan", Attribute::optional_computed_int64().with_range(1, 4094))
            .with_attribute("priority", Attribute::optional_computed_int64().with_range(0, 7))
            .with_attribute("dscp", Attribute::optional_computed_int64().with_range(0, 63)),
    )
}

fn block() -> Block {
    let block = Block::new()
        .with_description("Configure LLDP network policy.")
        .with_attribute("name", Attribute::optional_computed_string().with_length(0, 35))
        .with_attribute("comment", Attribute::optional_string().with_length(0, 1023));
    APPLICATIONS
        .iter()
        .fold(block, |block, name| block.with_block(*name, application()))
}
