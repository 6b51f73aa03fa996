// Copyright (c) Facebook, Inc. and its affiliates.
fn main() -> anyhow::Result<()> {
    // Missing git metadata (e.g. building from a tarball) only produces
    // warnings, full_version() falls back to the bare semver.
    vergen::EmitBuilder::builder()
        .all_cargo()
        .git_sha(true)
        .git_dirty(false)
        .emit()
}
