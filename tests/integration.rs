/// Integration tests for cbmdisk

use cbmdisk::commands;
use cbmdisk::*;
use std::path::{Path, PathBuf};
use std::process::Command;

fn blank_disk(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join("test.d64");
    let mut image =
        DiskImage::create(DiskImageFormat::D64, name, "01").expect("Failed to create image");
    image.save(&path).expect("Failed to save image");
    path
}

fn output_of(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
    let mut out = Vec::new();
    f(&mut out).expect("Command failed");
    String::from_utf8(out).expect("Output is not UTF-8")
}

fn cbmdisk(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_cbmdisk"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to run cbmdisk")
}

#[test]
fn test_dir_of_blank_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "WORK DISK");

    let text = output_of(|out| commands::list_dir(&disk, None, out));
    assert_eq!(text, "0 \"WORK DISK\" 2a\n664 BLOCKS FREE.\n");
}

#[test]
fn test_save_then_load_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "ROUND TRIP");

    // PRG with a load address followed by 1000 bytes of code
    let mut program = vec![0x01, 0x08];
    program.extend((0..1000u32).map(|i| (i * 7 % 256) as u8));
    let host_file = tmp.path().join("game.prg");
    std::fs::write(&host_file, &program).unwrap();

    let text = output_of(|out| commands::save_file(&disk, &host_file, FileType::Prg, false, out));
    assert_eq!(
        text,
        format!("Saved: {} into {}\n", host_file.display(), disk.display())
    );

    let listing = output_of(|out| commands::list_dir(&disk, None, out));
    assert_eq!(
        listing,
        "0 \"ROUND TRIP\" 2a\n4  \"GAME.PRG\"  PRG\n660 BLOCKS FREE.\n"
    );

    let output = tmp.path().join("extracted.prg");
    let text = output_of(|out| commands::load_file(&disk, "GAME.PRG", Some(&output), out));
    assert_eq!(text, format!("Loaded: {}\n", output.display()));
    assert_eq!(std::fs::read(&output).unwrap(), program);
}

#[test]
fn test_save_appends_after_existing_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "ORDER");

    for name in ["zeta", "alpha", "mid"] {
        let file = tmp.path().join(name);
        std::fs::write(&file, name.as_bytes()).unwrap();
        output_of(|out| commands::save_file(&disk, &file, FileType::Prg, false, out));
    }

    let image = DiskImage::open(&disk).unwrap();
    let names: Vec<String> = CbmFileSystem::new(&image)
        .read_dir()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["ZETA", "ALPHA", "MID"]);
}

#[test]
fn test_save_duplicate_fails_without_replace() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "DUPES");
    let file = tmp.path().join("data.seq");
    std::fs::write(&file, b"first").unwrap();

    commands::save_file(&disk, &file, FileType::Seq, false, &mut Vec::new()).unwrap();
    let before = std::fs::read(&disk).unwrap();

    let result = commands::save_file(&disk, &file, FileType::Seq, false, &mut Vec::new());
    assert!(matches!(result, Err(DiskError::FileExists(_))));
    assert_eq!(std::fs::read(&disk).unwrap(), before);

    std::fs::write(&file, b"second").unwrap();
    commands::save_file(&disk, &file, FileType::Seq, true, &mut Vec::new()).unwrap();
    let image = DiskImage::open(&disk).unwrap();
    assert_eq!(
        CbmFileSystem::new(&image).read_file("DATA.SEQ").unwrap(),
        b"second"
    );
}

#[test]
fn test_load_missing_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "EMPTY");

    let text = output_of(|out| commands::load_file(&disk, "NOTHING", None, out));
    assert_eq!(text, "File \"NOTHING\" not found.\n");
}

#[test]
fn test_delete_and_info() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "SCRATCH");
    let file = tmp.path().join("big");
    std::fs::write(&file, vec![0xEA; 5000]).unwrap();
    commands::save_file(&disk, &file, FileType::Prg, false, &mut Vec::new()).unwrap();

    let text = output_of(|out| commands::delete_file(&disk, "BIG", out));
    assert_eq!(text, "Deleted: BIG (20 blocks freed)\n");

    let info = output_of(|out| commands::show_info(&disk, out));
    assert!(info.contains("Disk name: SCRATCH\n"));
    assert!(info.contains("Free blocks: 664\n"));
    assert!(info.contains("BAM consistent: Yes\n"));
}

#[test]
fn test_format_extended_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = tmp.path().join("big.d64");

    let text = output_of(|out| commands::format_disk(&disk, "BIG", "XY", 40, out));
    assert_eq!(
        text,
        format!("Formatted: {} (D64 (40 tracks))\n", disk.display())
    );
    assert_eq!(std::fs::metadata(&disk).unwrap().len(), 196_608);

    let listing = output_of(|out| commands::list_dir(&disk, None, out));
    assert!(listing.ends_with("749 BLOCKS FREE.\n"));

    assert!(matches!(
        commands::format_disk(&disk, "BAD", "01", 80, &mut Vec::new()),
        Err(DiskError::InvalidFormat(_))
    ));
}

#[test]
fn test_dir_writes_basic_listing() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "BASIC");
    let prg = tmp.path().join("dir.prg");

    output_of(|out| commands::list_dir(&disk, Some(&prg), out));
    let bytes = std::fs::read(&prg).unwrap();
    assert_eq!(&bytes[..2], &[0x01, 0x08]);
    assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
}

#[test]
fn test_error_info_survives_save() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = tmp.path().join("errors.d64");

    let mut image = DiskImage::create(DiskImageFormat::D64WithErrors, "ERR", "01").unwrap();
    image.save(&disk).unwrap();
    let mut bytes = std::fs::read(&disk).unwrap();
    let last = bytes.len() - 1;
    bytes[last] = 0x05;
    std::fs::write(&disk, &bytes).unwrap();

    let file = tmp.path().join("x");
    std::fs::write(&file, b"x").unwrap();
    commands::save_file(&disk, &file, FileType::Prg, false, &mut Vec::new()).unwrap();

    let image = DiskImage::open(&disk).unwrap();
    assert_eq!(image.format(), DiskImageFormat::D64WithErrors);
    assert_eq!(image.error_info(35, 16), Some(0x05));
}

#[test]
fn test_cli_usage_on_missing_arguments() {
    let tmp = tempfile::tempdir().unwrap();
    let result = cbmdisk(tmp.path(), &["dir"]);

    assert!(result.status.success());
    assert_eq!(
        String::from_utf8_lossy(&result.stdout),
        format!("{}\n", commands::USAGE)
    );
}

#[test]
fn test_cli_invalid_command() {
    let tmp = tempfile::tempdir().unwrap();
    let result = cbmdisk(tmp.path(), &["load", "disk.d64"]);

    assert!(result.status.success());
    assert_eq!(
        String::from_utf8_lossy(&result.stdout),
        format!("{}\n", commands::INVALID_COMMAND)
    );
}

#[test]
fn test_cli_reports_errors_and_exits_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let result = cbmdisk(tmp.path(), &["dir", "missing.d64"]);

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.starts_with("Error listing directory: I/O error:"));
}

#[test]
fn test_cli_load_writes_prg_in_current_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "CLI");
    let file = tmp.path().join("hello");
    std::fs::write(&file, [0x01, 0x08, 0x60]).unwrap();

    let result = cbmdisk(tmp.path(), &["SAVE", "test.d64", "hello"]);
    assert_eq!(
        String::from_utf8_lossy(&result.stdout),
        "Saved: hello into test.d64\n"
    );

    let result = cbmdisk(tmp.path(), &["dir", "test.d64"]);
    assert_eq!(
        String::from_utf8_lossy(&result.stdout),
        "0 \"CLI\" 2a\n1  \"HELLO\"  PRG\n663 BLOCKS FREE.\n"
    );

    let result = cbmdisk(tmp.path(), &["load", "test.d64", "HELLO"]);
    assert!(result.status.success());
    assert_eq!(
        std::fs::read(tmp.path().join("HELLO.prg")).unwrap(),
        [0x01, 0x08, 0x60]
    );
    assert!(disk.exists());
}

#[test]
fn test_cli_dir_ignores_extra_arguments() {
    let tmp = tempfile::tempdir().unwrap();
    blank_disk(tmp.path(), "EXTRA");

    let result = cbmdisk(tmp.path(), &["dir", "test.d64", "extra"]);
    assert_eq!(
        String::from_utf8_lossy(&result.stdout),
        "0 \"EXTRA\" 2a\n664 BLOCKS FREE.\n"
    );
}

#[test]
fn test_cli_load_name_starting_with_hyphen() {
    let tmp = tempfile::tempdir().unwrap();
    blank_disk(tmp.path(), "HYPHEN");

    let result = cbmdisk(tmp.path(), &["load", "test.d64", "-X"]);
    assert!(result.status.success());
    assert_eq!(
        String::from_utf8_lossy(&result.stdout),
        "File \"-X\" not found.\n"
    );
}

#[test]
fn test_cli_wildcard_load_names_output_after_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "WILD");
    let file = tmp.path().join("hello");
    std::fs::write(&file, b"wildcard").unwrap();
    commands::save_file(&disk, &file, FileType::Prg, false, &mut Vec::new()).unwrap();

    let result = cbmdisk(tmp.path(), &["load", "test.d64", "HE*"]);
    let stdout = String::from_utf8_lossy(&result.stdout);
    let loaded = stdout
        .trim_end()
        .strip_prefix("Loaded: ")
        .expect("Failed to load by pattern");

    let loaded = Path::new(loaded);
    assert!(loaded.is_absolute());
    assert_eq!(loaded.file_name().unwrap(), "HELLO.prg");
    assert_eq!(std::fs::read(tmp.path().join("HELLO.prg")).unwrap(), b"wildcard");
    assert!(!tmp.path().join("HE*.prg").exists());
}

#[test]
fn test_cli_wildcard_load_keeps_output_in_current_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let disk = blank_disk(tmp.path(), "SLASH");

    let mut image = DiskImage::open(&disk).unwrap();
    CbmFileSystem::new(&mut image)
        .write_file("GAME/1", FileType::Prg, b"level one", false)
        .unwrap();
    image.save(&disk).unwrap();

    let result = cbmdisk(tmp.path(), &["load", "test.d64", "GAME*"]);
    assert!(result.status.success());
    assert_eq!(
        std::fs::read(tmp.path().join("GAME_1.prg")).unwrap(),
        b"level one"
    );
}
