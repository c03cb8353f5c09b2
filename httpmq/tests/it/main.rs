mod helper;
mod long_poll;
mod queue_api;
