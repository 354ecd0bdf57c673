/// Client figures, computed on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientStats {
    pub total_clients: i64,
    /// Most common first
    pub by_country: Vec<(String, i64)>,
    /// Ten most common cities
    pub by_city: Vec<(String, i64)>,
}

/// Report figures, computed on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStats {
    pub total_reports: i64,
    pub by_kind: Vec<(String, i64)>,
    pub by_format: Vec<(String, i64)>,
}
