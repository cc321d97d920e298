use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        // Any log backend is active; used by the `fmt` macros.
        logging: { any(feature = "defmt", feature = "log") },
        // Running on the Cortex-M target, as opposed to host-side tests.
        cortex_m_target: { all(target_arch = "arm", target_os = "none") },
    }
}
