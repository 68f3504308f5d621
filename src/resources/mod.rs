//! FortiOS object types served by the provider.
//!
//! Each module declares one object: its CMDB path, how it is addressed and
//! the field-for-field schema of the REST API. Everything else is generic.

pub mod firewall_policy;
pub mod router_isis;
pub mod router_static;
pub mod system_lldp_networkpolicy;
pub mod system_sdnconnector;

use crate::resource::ResourceDefinition;

/// Every declared object type.
pub fn all() -> Vec<ResourceDefinition> {
    vec![
        firewall_policy::definition(),
        router_isis::definition(),
        router_static::definition(),
        system_lldp_networkpolicy::definition(),
        system_sdnconnector::definition(),
    ]
}
