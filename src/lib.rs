pub mod timesort_core;
