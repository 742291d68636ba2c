fn main() {
    if let Err(err) = schema_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
