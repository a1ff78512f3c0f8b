fn main() -> std::process::ExitCode {
    streamkey_sniffer::run()
}
