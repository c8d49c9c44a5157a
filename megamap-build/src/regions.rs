//! Region shards queried by the map build
//!
//! One query per shard keeps each response under the remote source's result
//! cap. The list is fixed: 50 US states, the District of Columbia and Puerto
//! Rico, then the 13 Canadian provinces and territories.

/// US shard ids (states, DC, PR)
pub const US_REGIONS: &[&str] = &[
    "US-AL", "US-AK", "US-AZ", "US-AR", "US-CA", "US-CO", "US-CT", "US-DE", "US-FL", "US-GA",
    "US-HI", "US-ID", "US-IL", "US-IN", "US-IA", "US-KS", "US-KY", "US-LA", "US-ME", "US-MD",
    "US-MA", "US-MI", "US-MN", "US-MS", "US-MO", "US-MT", "US-NE", "US-NV", "US-NH", "US-NJ",
    "US-NM", "US-NY", "US-NC", "US-ND", "US-OH", "US-OK", "US-OR", "US-PA", "US-RI", "US-SC",
    "US-SD", "US-TN", "US-TX", "US-UT", "US-VT", "US-VA", "US-WA", "US-WV", "US-WI", "US-WY",
    "US-DC", "US-PR",
];

/// Canadian shard ids (provinces and territories)
pub const CA_REGIONS: &[&str] = &[
    "CA-AB", "CA-BC", "CA-MB", "CA-NB", "CA-NL", "CA-NS", "CA-NT", "CA-NU", "CA-ON", "CA-PE",
    "CA-QC", "CA-SK", "CA-YT",
];

/// Every shard in query order
pub fn all_regions() -> Vec<String> {
    US_REGIONS
        .iter()
        .chain(CA_REGIONS)
        .map(|r| r.to_string())
        .collect()
}
