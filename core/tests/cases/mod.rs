mod determinism;
mod route_error;
