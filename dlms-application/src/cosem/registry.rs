//! COSEM interface class and instance name registry

use dlms_core::ObisCode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Names of one COSEM interface class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosemClass {
    name: String,
    /// Attribute 2 onwards
    attributes: Vec<String>,
    /// Method 1 onwards
    methods: Vec<String>,
}

impl CosemClass {
    pub fn new(name: impl Into<String>, attributes: &[&str], methods: &[&str]) -> Self {
        Self {
            name: name.into(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            methods: methods.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute 1 is `logical_name` for every class
    pub fn attribute_name(&self, attribute_id: u8) -> Option<&str> {
        match attribute_id {
            0 => None,
            1 => Some("logical_name"),
            id => self.attributes.get(usize::from(id) - 2).map(String::as_str),
        }
    }

    pub fn method_name(&self, method_id: u8) -> Option<&str> {
        match method_id {
            0 => None,
            id => self.methods.get(usize::from(id) - 1).map(String::as_str),
        }
    }
}

/// Lookup capability consulted by the descriptor decoder
///
/// Both lookups are best effort; a miss only suppresses the readable name.
pub trait CosemLookup: Send + Sync {
    fn class(&self, class_id: u16) -> Option<&CosemClass>;

    fn instance_name(&self, instance: &ObisCode) -> Option<&str>;
}

/// Table backed [`CosemLookup`]
#[derive(Debug, Clone, Default)]
pub struct CosemRegistry {
    classes: HashMap<u16, CosemClass>,
    instances: HashMap<ObisCode, String>,
}

static STANDARD: Lazy<CosemRegistry> = Lazy::new(|| {
    let mut registry = CosemRegistry::empty();
    for (id, class) in standard_classes() {
        registry.register_class(id, class);
    }
    registry.register_instance(ObisCode::new(0, 0, 40, 0, 0, 255), "Current association");
    registry.register_instance(ObisCode::new(0, 0, 41, 0, 0, 255), "SAP assignment");
    registry.register_instance(ObisCode::new(0, 0, 42, 0, 0, 255), "COSEM logical device name");
    registry
});

impl CosemRegistry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// The well-known interface classes and instance names
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Add or replace a class
    pub fn register_class(&mut self, class_id: u16, class: CosemClass) -> &mut Self {
        self.classes.insert(class_id, class);
        self
    }

    /// Add or replace an instance name
    pub fn register_instance(&mut self, instance: ObisCode, name: impl Into<String>) -> &mut Self {
        self.instances.insert(instance, name.into());
        self
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl CosemLookup for CosemRegistry {
    fn class(&self, class_id: u16) -> Option<&CosemClass> {
        self.classes.get(&class_id)
    }

    fn instance_name(&self, instance: &ObisCode) -> Option<&str> {
        self.instances.get(instance).map(String::as_str)
    }
}

fn standard_classes() -> Vec<(u16, CosemClass)> {
    vec![
        (1, CosemClass::new("data", &["value"], &[])),
        (3, CosemClass::new("register", &["value", "scaler_unit"], &["reset"])),
        (
            4,
            CosemClass::new(
                "extended_register",
                &["value", "scaler_unit", "status", "capture_time"],
                &["reset"],
            ),
        ),
        (
            5,
            CosemClass::new(
                "demand_register",
                &[
                    "current_average_value",
                    "last_average_value",
                    "scaler_unit",
                    "status",
                    "capture_time",
                    "start_time_current",
                    "period",
                    "number_of_periods",
                ],
                &["reset", "next_period"],
            ),
        ),
        (
            7,
            CosemClass::new(
                "profile_generic",
                &[
                    "buffer",
                    "capture_objects",
                    "capture_period",
                    "sort_method",
                    "sort_object",
                    "entries_in_use",
                    "profile_entries",
                ],
                &["reset", "capture", "get_buffer_by_range", "get_buffer_by_index"],
            ),
        ),
        (
            8,
            CosemClass::new(
                "clock",
                &[
                    "time",
                    "time_zone",
                    "status",
                    "daylight_savings_begin",
                    "daylight_savings_end",
                    "daylight_savings_deviation",
                    "daylight_savings_enabled",
                    "clock_base",
                ],
                &[
                    "adjust_to_quarter",
                    "adjust_to_measuring_period",
                    "adjust_to_minute",
                    "adjust_to_preset_time",
                    "preset_adjusting_time",
                    "shift_time",
                ],
            ),
        ),
        (9, CosemClass::new("script_table", &["scripts"], &["execute"])),
        (
            10,
            CosemClass::new("schedule", &["entries"], &["enable_disable", "insert", "delete"]),
        ),
        (
            11,
            CosemClass::new("special_days_table", &["entries"], &["insert", "delete"]),
        ),
        (
            15,
            CosemClass::new(
                "association_ln",
                &[
                    "object_list",
                    "associated_partners_id",
                    "application_context_name",
                    "xdlms_context_info",
                    "authentication_mechanism_name",
                    "secret",
                    "association_status",
                    "security_setup_reference",
                    "user_list",
                    "current_user",
                ],
                &[
                    "reply_to_hls_authentication",
                    "change_hls_secret",
                    "add_object",
                    "remove_object",
                    "add_user",
                    "remove_user",
                ],
            ),
        ),
        (
            17,
            CosemClass::new(
                "sap_assignment",
                &["sap_assignment_list"],
                &["connect_logical_devices"],
            ),
        ),
        (
            18,
            CosemClass::new(
                "image_transfer",
                &[
                    "image_block_size",
                    "image_transferred_blocks_status",
                    "image_first_not_transferred_block_number",
                    "image_transfer_enabled",
                    "image_transfer_status",
                    "image_to_activate_info",
                ],
                &[
                    "image_transfer_initiate",
                    "image_block_transfer",
                    "image_verify",
                    "image_activate",
                ],
            ),
        ),
        (
            20,
            CosemClass::new(
                "activity_calendar",
                &[
                    "calendar_name_active",
                    "season_profile_active",
                    "week_profile_table_active",
                    "day_profile_table_active",
                    "calendar_name_passive",
                    "season_profile_passive",
                    "week_profile_table_passive",
                    "day_profile_table_passive",
                    "active_passive_calendar_time",
                ],
                &["active_passive_calendar"],
            ),
        ),
        (
            21,
            CosemClass::new(
                "register_monitor",
                &["thresholds", "monitored_value", "actions"],
                &[],
            ),
        ),
        (
            22,
            CosemClass::new(
                "single_action_schedule",
                &["executed_script", "type", "execution_time"],
                &[],
            ),
        ),
        (
            23,
            CosemClass::new(
                "iec_hdlc_setup",
                &[
                    "comm_speed",
                    "window_size_transmit",
                    "window_size_receive",
                    "max_info_field_length_transmit",
                    "max_info_field_length_receive",
                    "inter_octet_time_out",
                    "inactivity_time_out",
                    "device_address",
                ],
                &[],
            ),
        ),
        (
            30,
            CosemClass::new(
                "data_protection",
                &[
                    "protection_buffer",
                    "protection_object_list",
                    "protection_parameters_get",
                    "protection_parameters_set",
                    "required_protection",
                ],
                &[
                    "get_protected_attributes",
                    "set_protected_attributes",
                    "invoke_protected_method",
                ],
            ),
        ),
        (
            70,
            CosemClass::new(
                "disconnect_control",
                &["output_state", "control_state", "control_mode"],
                &["remote_disconnect", "remote_reconnect"],
            ),
        ),
        (
            71,
            CosemClass::new(
                "limiter",
                &[
                    "monitored_value",
                    "threshold_active",
                    "threshold_normal",
                    "threshold_emergency",
                    "min_over_threshold_duration",
                    "min_under_threshold_duration",
                    "emergency_profile",
                    "emergency_profile_group_id_list",
                    "emergency_profile_active",
                    "actions",
                ],
                &[],
            ),
        ),
        (
            104,
            CosemClass::new(
                "zigbee_network_control",
                &["enable_disable_joining", "join_timeout", "active_devices"],
                &[
                    "register_device",
                    "unregister_device",
                    "unregister_all_devices",
                    "backup_pan",
                    "restore_pan",
                    "identify_device",
                    "remove_mirror",
                    "update_network_key",
                    "update_link_key",
                    "create_pan",
                    "remove_pan",
                ],
            ),
        ),
        (
            111,
            CosemClass::new(
                "account",
                &[
                    "account_mode_and_status",
                    "current_credit_in_use",
                    "current_credit_status",
                    "available_credit",
                    "amount_to_clear",
                    "clearance_threshold",
                    "aggregated_debt",
                    "credit_reference_list",
                    "charge_reference_list",
                    "credit_charge_configuration",
                    "token_gateway_configuration",
                    "account_activation_time",
                    "account_closure_time",
                    "currency",
                    "low_credit_threshold",
                    "next_credit_available_threshold",
                    "max_provision",
                    "max_provision_period",
                ],
                &["activate_account", "close_account", "reset_account"],
            ),
        ),
        (
            112,
            CosemClass::new(
                "credit",
                &[
                    "current_credit_amount",
                    "credit_type",
                    "priority",
                    "warning_threshold",
                    "limit",
                    "credit_configuration",
                    "credit_status",
                    "preset_credit_amount",
                    "credit_available_threshold",
                    "period",
                ],
                &["update_amount", "set_amount_to_value", "invoke_credit"],
            ),
        ),
        (
            113,
            CosemClass::new(
                "charge",
                &[
                    "total_amount_paid",
                    "charge_type",
                    "priority",
                    "unit_charge_active",
                    "unit_charge_passive",
                    "unit_charge_activation_time",
                    "period",
                    "charge_configuration",
                    "last_collection_time",
                    "last_collection_amount",
                    "total_amount_remaining",
                    "proportion",
                ],
                &[
                    "update_unit_charge",
                    "activate_passive_unit_charge",
                    "collect",
                    "update_total_amount_remaining",
                    "set_total_amount_remaining",
                ],
            ),
        ),
        (
            115,
            CosemClass::new(
                "token_gateway",
                &[
                    "token",
                    "token_time",
                    "token_description",
                    "token_delivery_method",
                    "token_status",
                ],
                &["enter"],
            ),
        ),
        (
            9000,
            CosemClass::new(
                "extended_data",
                &[
                    "value_active",
                    "scaler_unit_active",
                    "value_passive",
                    "scaler_unit_passive",
                    "activate_passive_value_time",
                ],
                &["reset", "activate_passive_value"],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = CosemRegistry::standard();
        assert_eq!(registry.class_count(), 25);

        let clock = registry.class(8).unwrap();
        assert_eq!(clock.name(), "clock");
        assert_eq!(clock.attribute_name(1), Some("logical_name"));
        assert_eq!(clock.attribute_name(2), Some("time"));
        assert_eq!(clock.attribute_name(9), Some("clock_base"));
        assert_eq!(clock.attribute_name(10), None);
        assert_eq!(clock.attribute_name(0), None);
        assert_eq!(clock.method_name(1), Some("adjust_to_quarter"));
        assert_eq!(clock.method_name(0), None);

        assert_eq!(registry.class(111).and_then(|c| c.attribute_name(19)), Some("max_provision_period"));
        assert_eq!(registry.class(104).and_then(|c| c.method_name(11)), Some("remove_pan"));
        assert!(registry.class(9999).is_none());
    }

    #[test]
    fn test_standard_instance_names() {
        let registry = CosemRegistry::standard();
        assert_eq!(
            registry.instance_name(&ObisCode::new(0, 0, 40, 0, 0, 255)),
            Some("Current association")
        );
        assert_eq!(registry.instance_name(&ObisCode::new(1, 0, 1, 8, 0, 255)), None);
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = CosemRegistry::empty();
        assert!(registry.class(1).is_none());
        registry
            .register_class(1, CosemClass::new("data", &["value"], &[]))
            .register_instance(ObisCode::new(1, 0, 1, 8, 0, 255), "Active energy import");
        assert_eq!(registry.class(1).map(CosemClass::name), Some("data"));
        assert_eq!(
            registry.instance_name(&ObisCode::new(1, 0, 1, 8, 0, 255)),
            Some("Active energy import")
        );
    }
}
