//! Coverage emission metrics using metrics-rs.

use metrics::{Unit, counter, describe_counter};

/// Initialize metric descriptions.
///
/// Call this once at startup to register metric descriptions.
pub fn init() {
    describe_counter!(
        "covmap_functions_total",
        Unit::Count,
        "Total functions with a coverage mapping record"
    );
    describe_counter!(
        "covmap_regions_total",
        Unit::Count,
        "Total source regions encoded"
    );
    describe_counter!(
        "covmap_mapping_bytes_total",
        Unit::Bytes,
        "Total encoded function mapping bytes"
    );
    describe_counter!(
        "covmap_sections_total",
        Unit::Count,
        "Total coverage mapping sections emitted"
    );
}

/// Record one encoded function mapping.
pub fn record_function(regions: usize, bytes: usize) {
    counter!("covmap_functions_total").increment(1);
    counter!("covmap_regions_total").increment(regions as u64);
    counter!("covmap_mapping_bytes_total").increment(bytes as u64);
}

/// Record an emitted coverage mapping section.
pub fn record_section() {
    counter!("covmap_sections_total").increment(1);
}
