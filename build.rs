fn main() {
    println!("cargo:rerun-if-changed=appsettings.json");

    // Propagate the ESP-IDF build environment only for firmware builds;
    // host builds (tests, simulation) need no sysenv.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
