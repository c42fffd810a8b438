/// End-to-end tests for the encrypted overlay against real files on disk

use veilfs_core::{keyfile, EncryptedFile, FsContext, OpenFlags, OverlayConfig};
use veilfs_test_utils::TestVault;

use std::sync::Arc;

#[test]
fn test_write_read_reopen_cycle() {
    let vault = TestVault::new();
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 239) as u8).collect();

    {
        let mut file = vault.open_rw("data.bin");
        assert_eq!(file.write(0, &data).unwrap(), data.len());
        assert_eq!(file.attr().unwrap().size, data.len() as u64);
    }

    // Reopen read-only and verify the content survived the handle
    let mut file = vault.open_flags("data.bin", OpenFlags::read_only()).unwrap();
    assert_eq!(file.read(0, data.len()).unwrap(), data);
    assert_eq!(file.attr().unwrap().size, data.len() as u64);
}

#[test]
fn test_write_only_handle_can_do_partial_writes() {
    let vault = TestVault::new();

    {
        let mut file = vault.open_rw("data.bin");
        file.write(0, &vec![0x11u8; 4096]).unwrap();
    }

    // A write-only open still works for partial writes: the handle is
    // silently upgraded so the RMW pre-read can run.
    {
        let mut file = vault
            .open_flags("data.bin", OpenFlags::write_only())
            .unwrap();
        assert!(file.is_write_only());
        file.write(10, &[0xEEu8; 5]).unwrap();
    }

    let mut file = vault.open_flags("data.bin", OpenFlags::read_only()).unwrap();
    let content = file.read(0, 4096).unwrap();
    assert_eq!(&content[..10], &[0x11u8; 10]);
    assert_eq!(&content[10..15], &[0xEEu8; 5]);
    assert_eq!(&content[15..], vec![0x11u8; 4096 - 15].as_slice());
}

#[test]
fn test_append_intent_is_ignored() {
    let vault = TestVault::new();

    let mut file = vault
        .open_flags(
            "data.bin",
            OpenFlags::read_write().with_create().with_append(),
        )
        .unwrap();

    // Writes land at the addressed offsets, not at end-of-file
    file.write(0, b"AAAAA").unwrap();
    file.write(1, b"BB").unwrap();

    assert_eq!(file.read(0, 5).unwrap(), b"ABBAA".as_slice());
    assert_eq!(file.attr().unwrap().size, 5);
}

#[test]
fn test_ciphertext_on_disk_differs_from_plaintext() {
    let vault = TestVault::new();
    let plain = vec![0x42u8; 5000];

    {
        let mut file = vault.open_rw("data.bin");
        file.write(0, &plain).unwrap();
    }

    let raw = std::fs::read(vault.path("data.bin")).unwrap();
    assert_eq!(raw.len() as u64, vault.ctx.layout().cipher_size(5000));
    // No plaintext run survives on disk
    assert!(!raw.windows(64).any(|w| w == &plain[..64]));
}

#[test]
fn test_many_files_share_one_context() {
    let vault = TestVault::new();

    let mut a = vault.open_rw("a.bin");
    let mut b = vault.open_rw("b.bin");

    a.write(0, b"file a content").unwrap();
    b.write(0, b"something else entirely").unwrap();

    assert_eq!(a.read(0, 14).unwrap(), b"file a content".as_slice());
    assert_eq!(b.read(0, 23).unwrap(), b"something else entirely".as_slice());
}

#[test]
fn test_keyfile_end_to_end() -> anyhow::Result<()> {
    let vault = TestVault::new();
    let key_path = vault.path("master.key");
    let config = OverlayConfig::default();

    // First session: create the wrapped key, write a file
    {
        let key = keyfile::create(&key_path, "hunter2")?;
        let ctx = Arc::new(FsContext::new(&key, &config));
        let mut file = EncryptedFile::open(
            ctx,
            vault.path("data.bin"),
            OpenFlags::read_write().with_create(),
        )?;
        file.write(0, b"persisted across sessions")?;
    }

    // Second session: unwrap the key from disk and read the file back
    let key = keyfile::load(&key_path, "hunter2")?;
    let ctx = Arc::new(FsContext::new(&key, &config));
    let mut file = EncryptedFile::open(ctx, vault.path("data.bin"), OpenFlags::read_only())?;
    assert_eq!(file.read(0, 25)?, b"persisted across sessions".as_slice());

    Ok(())
}
