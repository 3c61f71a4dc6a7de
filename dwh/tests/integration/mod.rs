mod stage_failure_test;
mod warehouse_run_test;
