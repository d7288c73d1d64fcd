// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Upstream Hubris detects the exact ARM profile (M0 vs M3+) through its
// build-util crate, which also wires up linker scripts and memory maps for
// the kernel image. We only care about the single bit it exposes here, so
// we derive it straight from the target triple instead of pulling that
// build system in.
fn main() {
    let target = std::env::var("TARGET").unwrap_or_default();
    let is_armv6m = target.starts_with("thumbv6m-");
    println!("cargo:rustc-check-cfg=cfg(armv6m)");
    if is_armv6m {
        println!("cargo:rustc-cfg=armv6m");
    }
}
