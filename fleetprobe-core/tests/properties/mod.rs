mod host_list_tests;
mod probe_set_tests;
mod queue_tests;
mod record_format_tests;
