fn main() {
    // Only the ESP-IDF firmware build needs the IDF environment exported;
    // host builds (tests, simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
