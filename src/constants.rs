/// Stage names used in logs, metrics labels and error context
pub const INGESTION_STAGE: &str = "ingestion";
pub const CLEANING_STAGE: &str = "cleaning";
pub const AGGREGATION_STAGE: &str = "aggregation";

// Default snapshot locations, relative to `<base>/delta`
pub const RAW_SNAPSHOT: &str = "nyc_taxi_raw";
pub const CLEAN_SNAPSHOT: &str = "nyc_taxi_clean";
pub const SUMMARY_SNAPSHOT: &str = "nyc_taxi_summary";

pub const DEFAULT_BASE_PATH: &str = "/user/ali";
pub const DEFAULT_INPUT_FILE: &str = "taxi_tripdata.csv";
pub const DEFAULT_CONFIG_FILE: &str = "lakehouse.toml";

// Source column names
pub const FARE_COLUMN: &str = "fare_amount";
pub const DISTANCE_COLUMN: &str = "trip_distance";
pub const PICKUP_COLUMN: &str = "PULocationID";
pub const DROPOFF_COLUMN: &str = "DOLocationID";

// Derived column names
pub const TRIP_TYPE_COLUMN: &str = "trip_type";
pub const AVG_FARE_COLUMN: &str = "avg_fare";

/// Labels produced by trip classification
pub const TRIP_SHORT: &str = "short";
pub const TRIP_MEDIUM: &str = "medium";
pub const TRIP_LONG: &str = "long";

/// Environment overrides applied on top of the config file
pub const ENV_BASE_PATH: &str = "LAKEHOUSE_BASE_PATH";
pub const ENV_INPUT_PATH: &str = "LAKEHOUSE_INPUT_PATH";
pub const ENV_METRICS_ADDR: &str = "LAKEHOUSE_METRICS_ADDR";
