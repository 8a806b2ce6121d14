use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::*;

/// Fixed place name so runs never reach the network.
pub const TEST_LOCATION: &str = "测试地点";

/// Input directory with one phone-style photo and a copy of it under another name.
pub fn setup_input_dir(temp_dir: &TempDir) -> ChildPath {
    let input = temp_dir.child("input");
    input
        .child("IMG_20211002_0849.jpg")
        .write_binary(b"not really a jpeg")
        .unwrap();
    input
        .child("backup/IMG_20211002_0849 copy.jpg")
        .write_binary(b"not really a jpeg")
        .unwrap();
    input
}

/// `timesort` run from inside `temp_dir`, writing to `temp_dir/output`.
pub fn timesort_cmd(temp_dir: &TempDir, input: &ChildPath) -> Command {
    let mut cmd = Command::cargo_bin("timesort").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("--input")
        .arg(input.path())
        .arg("--output")
        .arg(temp_dir.child("output").path())
        .arg("-L")
        .arg(TEST_LOCATION);
    cmd
}
