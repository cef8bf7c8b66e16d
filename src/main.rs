fn main() -> std::process::ExitCode {
    issuedesk_lib::run()
}
