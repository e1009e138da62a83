fn main() -> std::process::ExitCode {
    taskflow_lib::run()
}
