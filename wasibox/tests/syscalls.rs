//! End-to-end exercises of the syscall surface at the typed trait level,
//! with scripted stdio devices. The wasm loader itself is an external
//! collaborator; the run loop's exit-code plumbing is covered by the
//! `EXITCODE_INTERRUPTED` contract and the adapter's unwind values.

use std::{
    io::{IoSlice, IoSliceMut},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use wasibox::{
    abort::AbortSignal,
    handle::Preopen,
    string_representation::Bytes,
    volume::MemVolume,
    wasi_snapshot_preview1::{
        QueuedStdin, SharedSink, StdioDevices, WasiHost, EXITCODE_INTERRUPTED,
        RIGHTS_DIRECTORY_BASE, RIGHTS_DIRECTORY_INHERITING, RIGHTS_REGULAR_FILE_BASE,
    },
};
use wasibox_core::wasi_snapshot_preview1::{
    Dircookie, Errno, Eventtype, Exitcode, Fd, Fdflags, Filedelta, Filesize, Filetype,
    Lookupflags, Oflags, Prestat, Rights, Subscription, SubscriptionClock,
    SubscriptionFdReadwrite, SubscriptionU, Timestamp, Userdata, WasiImports, Whence,
};

const PREOPEN_FD: Fd = Fd(3);

struct Fixture {
    host: Arc<WasiHost<Bytes>>,
    volume: MemVolume,
    stdin: QueuedStdin,
    stdout: SharedSink,
    #[allow(dead_code)]
    stderr: SharedSink,
    abort: AbortSignal,
}

fn fixture_with_args(args: &[&[u8]]) -> Fixture {
    let volume = MemVolume::new();
    volume.mkdir(b"/sandbox", false).unwrap();

    let stdin = QueuedStdin::new();
    let stdout = SharedSink::new();
    let stderr = SharedSink::new();
    let abort = AbortSignal::new();

    let host = WasiHost::<Bytes>::new(
        args.iter().map(|a| a.to_vec()),
        Vec::<Vec<u8>>::new(),
        StdioDevices::new(stdin.clone(), stdout.clone(), stderr.clone()),
        vec![Preopen::new(&b"/sandbox"[..], &volume, b"/sandbox").unwrap()],
        abort.clone(),
    );

    Fixture {
        host,
        volume,
        stdin,
        stdout,
        stderr,
        abort,
    }
}

fn fixture() -> Fixture {
    fixture_with_args(&[b"guest"])
}

fn read_rights() -> Rights {
    Rights::FD_READ | Rights::FD_SEEK | Rights::FD_TELL | Rights::FD_FILESTAT_GET
}

fn open(
    host: &WasiHost<Bytes>,
    path: &[u8],
    oflags: Oflags,
    rights: Rights,
    fdflags: Fdflags,
) -> Result<Fd, Errno> {
    host.path_open(
        PREOPEN_FD,
        Lookupflags::empty(),
        path,
        oflags,
        rights,
        Rights::empty(),
        fdflags,
    )
}

fn read_some(host: &WasiHost<Bytes>, fd: Fd, len: usize) -> Result<Vec<u8>, Errno> {
    let mut buf = vec![0u8; len];
    let n = {
        let mut iovs = [IoSliceMut::new(&mut buf[..])];
        host.fd_read(fd, &mut iovs)?
    };
    buf.truncate(n.0 as usize);
    Ok(buf)
}

fn write_all(host: &WasiHost<Bytes>, fd: Fd, bytes: &[u8]) -> Result<u32, Errno> {
    let iovs = [IoSlice::new(bytes)];
    host.fd_write(fd, &iovs).map(|size| size.0)
}

fn list_dir(host: &WasiHost<Bytes>, fd: Fd) -> Vec<(u64, Vec<u8>, Filetype, u64)> {
    let mut entries = Vec::new();
    let mut cookie = Dircookie(0);

    while let Some((dirent, name)) = host.fd_readdir(fd, cookie).unwrap() {
        entries.push((dirent.d_next.0, name.clone(), dirent.d_type, dirent.d_ino.0));
        assert_eq!(dirent.d_namlen.0 as usize, name.len());
        cookie = dirent.d_next;
    }

    entries
}

#[test]
fn args_and_environ_round_trip() {
    let volume = MemVolume::new();
    volume.mkdir(b"/sandbox", false).unwrap();

    let host = WasiHost::<Bytes>::new(
        vec![&b"cat"[..], b"/sandbox/input.txt"],
        vec![&b"HOME=/sandbox"[..], b"LANG=C"],
        StdioDevices::new(QueuedStdin::new(), SharedSink::new(), SharedSink::new()),
        vec![Preopen::new(&b"/sandbox"[..], &volume, b"/sandbox").unwrap()],
        AbortSignal::new(),
    );

    assert_eq!(
        host.args_get().unwrap(),
        [b"cat".to_vec(), b"/sandbox/input.txt".to_vec()]
    );
    assert_eq!(
        host.environ_get().unwrap(),
        [b"HOME=/sandbox".to_vec(), b"LANG=C".to_vec()]
    );
}

#[test]
fn prestat_enumeration_walks_until_badf() {
    let f = fixture();

    match f.host.fd_prestat_get(PREOPEN_FD).unwrap() {
        Prestat::Dir { pr_name_len } => assert_eq!(pr_name_len.0, b"/sandbox".len() as u32),
    }
    assert_eq!(f.host.fd_prestat_dir_name(PREOPEN_FD).unwrap(), b"/sandbox");

    assert_eq!(f.host.fd_prestat_get(Fd(4)).unwrap_err(), Errno::Badf);
    assert_eq!(f.host.fd_prestat_get(Fd(0)).unwrap_err(), Errno::Badf);
}

#[test]
fn cat_a_prepopulated_file() {
    // Scenario: guest argv ["cat", "/sandbox/input.txt"]; the guest opens
    // the file, reads it and writes it to stdout.
    let f = fixture_with_args(&[b"cat", b"/sandbox/input.txt"]);
    f.volume
        .write_file(b"/sandbox/input.txt", &b"hello from input.txt\n"[..], false)
        .unwrap();

    let fd = open(
        &f.host,
        b"/sandbox/input.txt",
        Oflags::empty(),
        read_rights(),
        Fdflags::empty(),
    )
    .unwrap();

    let content = read_some(&f.host, fd, 64).unwrap();
    write_all(&f.host, Fd(1), &content).unwrap();
    f.host.fd_close(fd).unwrap();

    assert_eq!(f.stdout.contents(), b"hello from input.txt\n");
}

#[test]
fn write_seek_read_round_trip() {
    let f = fixture();

    let fd = open(
        &f.host,
        b"out.bin",
        Oflags::CREAT,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();

    assert_eq!(write_all(&f.host, fd, b"payload").unwrap(), 7);
    assert_eq!(f.host.fd_tell(fd).unwrap(), Filesize(7));

    f.host.fd_seek(fd, Filedelta(0), Whence::Set).unwrap();
    assert_eq!(read_some(&f.host, fd, 7).unwrap(), b"payload");
}

#[test]
fn fd_and_path_stat_agree_after_open() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/stat.me", &b"0123456789"[..], false)
        .unwrap();

    let fd = open(
        &f.host,
        b"stat.me",
        Oflags::empty(),
        read_rights(),
        Fdflags::empty(),
    )
    .unwrap();

    let by_fd = f.host.fd_filestat_get(fd).unwrap();
    let by_path = f
        .host
        .path_filestat_get(PREOPEN_FD, Lookupflags::empty(), b"stat.me")
        .unwrap();

    assert_eq!(by_fd.ino.0, by_path.ino.0);
    assert_eq!(by_fd.dev.0, by_path.dev.0);
    assert_eq!(by_fd.size.0, by_path.size.0);
    assert_eq!(by_fd.filetype, by_path.filetype);
    assert_eq!(by_fd.mtim.0, by_path.mtim.0);
    assert_eq!(by_fd.ctim.0, by_path.ctim.0);
}

#[test]
fn readdir_order_types_and_cookies() {
    // Scenario: entries inserted in order dir d1, file f1, file f2.
    let f = fixture();
    f.volume.mkdir(b"/sandbox/d1", false).unwrap();
    f.volume
        .write_file(b"/sandbox/f1", &b""[..], false)
        .unwrap();
    f.volume
        .write_file(b"/sandbox/f2", &b""[..], false)
        .unwrap();

    let dir = open(
        &f.host,
        b"/sandbox",
        Oflags::DIRECTORY,
        RIGHTS_DIRECTORY_BASE,
        Fdflags::empty(),
    )
    .unwrap();

    let first_pass = list_dir(&f.host, dir);
    let names: Vec<_> = first_pass.iter().map(|(_, name, _, _)| name.clone()).collect();
    assert_eq!(names, [b"d1".to_vec(), b"f1".to_vec(), b"f2".to_vec()]);
    assert_eq!(first_pass[0].2, Filetype::Directory);
    assert_eq!(first_pass[1].2, Filetype::RegularFile);
    assert_eq!(first_pass[2].2, Filetype::RegularFile);

    // Two back-to-back passes with no mutations are identical.
    assert_eq!(first_pass, list_dir(&f.host, dir));

    // Resuming from an emitted cookie yields the strict suffix.
    let resume = f
        .host
        .fd_readdir(dir, Dircookie(first_pass[0].0))
        .unwrap()
        .unwrap();
    assert_eq!(resume.1, b"f1");
}

#[test]
fn readdir_cookie_survives_insertion() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/a", &b""[..], false)
        .unwrap();

    let dir = open(
        &f.host,
        b"/sandbox",
        Oflags::DIRECTORY,
        RIGHTS_DIRECTORY_BASE,
        Fdflags::empty(),
    )
    .unwrap();

    let (dirent, name) = f.host.fd_readdir(dir, Dircookie(0)).unwrap().unwrap();
    assert_eq!(name, b"a");

    // A new entry created between calls gets a strictly greater cookie
    // and shows up when resuming.
    f.volume
        .write_file(b"/sandbox/b", &b""[..], false)
        .unwrap();

    let (_, name) = f.host.fd_readdir(dir, dirent.d_next).unwrap().unwrap();
    assert_eq!(name, b"b");
}

#[test]
fn path_escape_is_rejected_without_side_effects() {
    // Scenario: `cd /sandbox/../..` issues path_open("/sandbox/../..").
    let f = fixture();

    let err = open(
        &f.host,
        b"/sandbox/../..",
        Oflags::DIRECTORY,
        RIGHTS_DIRECTORY_BASE,
        Fdflags::empty(),
    )
    .unwrap_err();
    assert_eq!(err, Errno::Notcapable);

    let err = open(
        &f.host,
        b"..",
        Oflags::DIRECTORY,
        RIGHTS_DIRECTORY_BASE,
        Fdflags::empty(),
    )
    .unwrap_err();
    assert_eq!(err, Errno::Notcapable);

    // No descriptor was allocated: the next open still lands on fd 4.
    f.volume
        .write_file(b"/sandbox/f", &b""[..], false)
        .unwrap();
    let fd = open(
        &f.host,
        b"f",
        Oflags::empty(),
        read_rights(),
        Fdflags::empty(),
    )
    .unwrap();
    assert_eq!(fd, Fd(4));
}

#[test]
fn dot_dot_inside_the_sandbox_resolves() {
    let f = fixture();
    f.volume.mkdir(b"/sandbox/d", false).unwrap();
    f.volume
        .write_file(b"/sandbox/f", &b"top"[..], false)
        .unwrap();

    let fd = open(
        &f.host,
        b"d/../f",
        Oflags::empty(),
        read_rights(),
        Fdflags::empty(),
    )
    .unwrap();

    assert_eq!(read_some(&f.host, fd, 8).unwrap(), b"top");
}

#[test]
fn remove_populated_directory_fails_with_notempty() {
    // Scenario: mkdir d; touch d/x; rmdir d.
    let f = fixture();

    f.host.path_create_directory(PREOPEN_FD, b"d").unwrap();
    let fd = open(
        &f.host,
        b"d/x",
        Oflags::CREAT,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();
    f.host.fd_close(fd).unwrap();

    assert_eq!(
        f.host.path_remove_directory(PREOPEN_FD, b"d").unwrap_err(),
        Errno::Notempty
    );

    // d and d/x are still there.
    assert!(f
        .host
        .path_filestat_get(PREOPEN_FD, Lookupflags::empty(), b"d/x")
        .is_ok());

    f.host.path_unlink_file(PREOPEN_FD, b"d/x").unwrap();
    f.host.path_remove_directory(PREOPEN_FD, b"d").unwrap();
    assert_eq!(
        f.host
            .path_filestat_get(PREOPEN_FD, Lookupflags::empty(), b"d")
            .unwrap_err(),
        Errno::Noent
    );
}

#[test]
fn append_across_two_opens() {
    // Scenario: write "a\n", then reopen keeping content and append "b\n".
    let f = fixture();

    let fd = open(
        &f.host,
        b"out.txt",
        Oflags::CREAT | Oflags::TRUNC,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();
    write_all(&f.host, fd, b"a\n").unwrap();
    f.host.fd_close(fd).unwrap();

    let fd = open(
        &f.host,
        b"out.txt",
        Oflags::empty(),
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::APPEND,
    )
    .unwrap();
    write_all(&f.host, fd, b"b\n").unwrap();
    f.host.fd_close(fd).unwrap();

    assert_eq!(f.volume.read_file(b"/sandbox/out.txt").unwrap(), b"a\nb\n");
    assert_eq!(f.volume.stat(b"/sandbox/out.txt").unwrap().size, 4);
}

#[test]
fn writable_stream_publishes_atomically() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/shared", &b"before"[..], false)
        .unwrap();

    // Reader opens first and keeps its descriptor across the writer's
    // close.
    let reader = open(
        &f.host,
        b"shared",
        Oflags::empty(),
        read_rights(),
        Fdflags::empty(),
    )
    .unwrap();

    let writer = open(
        &f.host,
        b"shared",
        Oflags::TRUNC,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();
    write_all(&f.host, writer, b"after, and longer").unwrap();

    // Not yet published.
    assert_eq!(f.volume.read_file(b"/sandbox/shared").unwrap(), b"before");

    f.host.fd_close(writer).unwrap();

    // Published for fresh opens, invisible to the pre-close reader.
    assert_eq!(
        f.volume.read_file(b"/sandbox/shared").unwrap(),
        b"after, and longer"
    );
    assert_eq!(read_some(&f.host, reader, 32).unwrap(), b"before");
}

#[test]
fn unlinked_file_stays_readable_through_open_descriptor() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/victim", &b"still here"[..], false)
        .unwrap();

    let fd = open(
        &f.host,
        b"victim",
        Oflags::empty(),
        read_rights(),
        Fdflags::empty(),
    )
    .unwrap();

    f.host.path_unlink_file(PREOPEN_FD, b"victim").unwrap();
    assert_eq!(
        f.host
            .path_filestat_get(PREOPEN_FD, Lookupflags::empty(), b"victim")
            .unwrap_err(),
        Errno::Noent
    );

    assert_eq!(read_some(&f.host, fd, 16).unwrap(), b"still here");
}

#[test]
fn open_flag_enforcement() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/plain", &b"x"[..], false)
        .unwrap();
    f.volume.mkdir(b"/sandbox/dir", false).unwrap();

    // excl on an existing file
    assert_eq!(
        open(
            &f.host,
            b"plain",
            Oflags::CREAT | Oflags::EXCL,
            RIGHTS_REGULAR_FILE_BASE,
            Fdflags::empty(),
        )
        .unwrap_err(),
        Errno::Exist
    );

    // directory requested but target is a file
    assert_eq!(
        open(
            &f.host,
            b"plain",
            Oflags::DIRECTORY,
            RIGHTS_DIRECTORY_BASE,
            Fdflags::empty(),
        )
        .unwrap_err(),
        Errno::Notdir
    );

    // trailing slash forces a directory check
    assert_eq!(
        open(
            &f.host,
            b"plain/",
            Oflags::empty(),
            read_rights(),
            Fdflags::empty(),
        )
        .unwrap_err(),
        Errno::Notdir
    );

    // writing to a directory is not a thing
    assert_eq!(
        open(
            &f.host,
            b"dir",
            Oflags::empty(),
            RIGHTS_REGULAR_FILE_BASE,
            Fdflags::empty(),
        )
        .unwrap_err(),
        Errno::Isdir
    );

    // missing without creat
    assert_eq!(
        open(
            &f.host,
            b"absent",
            Oflags::empty(),
            read_rights(),
            Fdflags::empty(),
        )
        .unwrap_err(),
        Errno::Noent
    );
}

#[test]
fn rights_gate_reads_and_writes() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/locked", &b"data"[..], false)
        .unwrap();

    let fd = open(
        &f.host,
        b"locked",
        Oflags::empty(),
        Rights::FD_READ,
        Fdflags::empty(),
    )
    .unwrap();

    assert_eq!(
        write_all(&f.host, fd, b"nope").unwrap_err(),
        Errno::Notcapable
    );
    assert_eq!(
        f.host.fd_seek(fd, Filedelta(0), Whence::End).unwrap_err(),
        Errno::Notcapable
    );

    // Rights can only shrink.
    assert_eq!(
        f.host
            .fd_fdstat_set_rights(fd, Rights::FD_READ | Rights::FD_WRITE, Rights::empty())
            .unwrap_err(),
        Errno::Notcapable
    );
    f.host
        .fd_fdstat_set_rights(fd, Rights::empty(), Rights::empty())
        .unwrap();
    assert_eq!(read_some(&f.host, fd, 4).unwrap_err(), Errno::Notcapable);
}

#[test]
fn requested_rights_must_fit_the_inheriting_set() {
    let f = fixture();

    assert_eq!(
        f.host
            .path_open(
                PREOPEN_FD,
                Lookupflags::empty(),
                b"whatever",
                Oflags::CREAT,
                Rights::all(),
                Rights::empty(),
                Fdflags::empty(),
            )
            .unwrap_err(),
        Errno::Notcapable
    );

    // The directory's inheriting set itself is fine.
    let fd = f
        .host
        .path_open(
            PREOPEN_FD,
            Lookupflags::empty(),
            b"whatever",
            Oflags::CREAT,
            RIGHTS_REGULAR_FILE_BASE,
            Rights::empty(),
            Fdflags::empty(),
        )
        .unwrap();
    assert_eq!(
        f.host.fd_fdstat_get(fd).unwrap().fs_rights_base,
        RIGHTS_REGULAR_FILE_BASE
    );
    assert!(RIGHTS_DIRECTORY_INHERITING.contains(RIGHTS_REGULAR_FILE_BASE));
}

#[test]
fn seek_and_tell_semantics() {
    let f = fixture();

    let fd = open(
        &f.host,
        b"seek.me",
        Oflags::CREAT,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();
    write_all(&f.host, fd, b"0123456789").unwrap();

    assert_eq!(
        f.host.fd_seek(fd, Filedelta(-3), Whence::End).unwrap(),
        Filesize(7)
    );
    assert_eq!(
        f.host.fd_seek(fd, Filedelta(2), Whence::Cur).unwrap(),
        Filesize(9)
    );
    assert_eq!(f.host.fd_tell(fd).unwrap(), Filesize(9));

    // A negative resulting offset is invalid.
    assert_eq!(
        f.host.fd_seek(fd, Filedelta(-1), Whence::Set).unwrap_err(),
        Errno::Inval
    );

    // Seeking past the end is legal; reads there see end-of-file.
    f.host.fd_seek(fd, Filedelta(100), Whence::Set).unwrap();
    assert_eq!(read_some(&f.host, fd, 4).unwrap(), b"");
}

#[test]
fn pread_and_pwrite_leave_the_cursor_alone() {
    let f = fixture();

    let fd = open(
        &f.host,
        b"p.bin",
        Oflags::CREAT,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();
    write_all(&f.host, fd, b"abcdef").unwrap();

    let mut buf = [0u8; 2];
    let n = {
        let mut iovs = [IoSliceMut::new(&mut buf[..])];
        f.host.fd_pread(fd, &mut iovs, Filesize(1)).unwrap()
    };
    assert_eq!(n.0, 2);
    assert_eq!(&buf, b"bc");
    assert_eq!(f.host.fd_tell(fd).unwrap(), Filesize(6));

    let iovs = [IoSlice::new(&b"XY"[..])];
    f.host.fd_pwrite(fd, &iovs, Filesize(0)).unwrap();
    assert_eq!(f.host.fd_tell(fd).unwrap(), Filesize(6));

    f.host.fd_seek(fd, Filedelta(0), Whence::Set).unwrap();
    assert_eq!(read_some(&f.host, fd, 6).unwrap(), b"XYcdef");
}

#[test]
fn renumber_closes_target_and_transplants() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/a", &b"A"[..], false)
        .unwrap();
    f.volume
        .write_file(b"/sandbox/b", &b"B"[..], false)
        .unwrap();

    let a = open(&f.host, b"a", Oflags::empty(), read_rights(), Fdflags::empty()).unwrap();
    let b = open(&f.host, b"b", Oflags::empty(), read_rights(), Fdflags::empty()).unwrap();

    f.host.fd_renumber(a, b).unwrap();
    assert_eq!(read_some(&f.host, b, 4).unwrap(), b"A");
    assert_eq!(f.host.fd_tell(a).unwrap_err(), Errno::Badf);

    // Renumbering onto a closed descriptor number also works.
    f.host.fd_renumber(b, Fd(9)).unwrap();
    assert_eq!(f.host.fd_tell(Fd(9)).unwrap(), Filesize(1));
}

#[test]
fn rename_within_and_across_volumes() {
    let volume_a = MemVolume::new();
    let volume_b = MemVolume::new();
    volume_a.mkdir(b"/a", false).unwrap();
    volume_b.mkdir(b"/b", false).unwrap();
    volume_a
        .write_file(b"/a/file", &b"payload"[..], false)
        .unwrap();

    let host = WasiHost::<Bytes>::new(
        vec![&b"guest"[..]],
        Vec::<Vec<u8>>::new(),
        StdioDevices::new(QueuedStdin::new(), SharedSink::new(), SharedSink::new()),
        vec![
            Preopen::new(&b"/a"[..], &volume_a, b"/a").unwrap(),
            Preopen::new(&b"/b"[..], &volume_b, b"/b").unwrap(),
        ],
        AbortSignal::new(),
    );

    // Same volume: rename there and back restores the original state.
    host.path_rename(Fd(3), b"file", Fd(3), b"renamed").unwrap();
    host.path_rename(Fd(3), b"renamed", Fd(3), b"file").unwrap();
    assert_eq!(volume_a.read_file(b"/a/file").unwrap(), b"payload");
    assert_eq!(
        volume_a.stat(b"/a/renamed").unwrap_err(),
        wasibox::volume::VolumeError::NotFound
    );

    // Different volumes: cross-device.
    assert_eq!(
        host.path_rename(Fd(3), b"file", Fd(4), b"file").unwrap_err(),
        Errno::Xdev
    );
}

#[test]
fn filestat_set_size_and_times() {
    let f = fixture();
    f.volume
        .write_file(b"/sandbox/t", &b"abc"[..], false)
        .unwrap();

    let fd = open(
        &f.host,
        b"t",
        Oflags::empty(),
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();

    f.host.fd_filestat_set_size(fd, Filesize(6)).unwrap();
    assert_eq!(f.host.fd_filestat_get(fd).unwrap().size, Filesize(6));

    use wasibox_core::wasi_snapshot_preview1::Fstflags;
    f.host
        .fd_filestat_set_times(
            fd,
            Timestamp(1_000),
            Timestamp(2_000),
            Fstflags::ATIM | Fstflags::MTIM,
        )
        .unwrap();
    let stat = f.host.fd_filestat_get(fd).unwrap();
    assert_eq!(stat.atim, Timestamp(1_000));
    assert_eq!(stat.mtim, Timestamp(2_000));

    // Explicit and "now" for the same stamp conflict.
    assert_eq!(
        f.host
            .fd_filestat_set_times(
                fd,
                Timestamp(0),
                Timestamp(0),
                Fstflags::ATIM | Fstflags::ATIM_NOW,
            )
            .unwrap_err(),
        Errno::Inval
    );
}

#[test]
fn sync_datasync_advise_allocate_are_noops() {
    let f = fixture();

    let fd = open(
        &f.host,
        b"n",
        Oflags::CREAT,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();

    f.host.fd_sync(fd).unwrap();
    f.host.fd_datasync(fd).unwrap();
    f.host
        .fd_advise(
            fd,
            Filesize(0),
            Filesize(0),
            wasibox_core::wasi_snapshot_preview1::Advice::Sequential,
        )
        .unwrap();
    f.host.fd_allocate(fd, Filesize(0), Filesize(4096)).unwrap();
}

#[test]
fn unsupported_link_surface_reports_notsup() {
    let f = fixture();

    assert_eq!(
        f.host
            .path_symlink(b"target", PREOPEN_FD, b"link")
            .unwrap_err(),
        Errno::Notsup
    );
    assert_eq!(
        f.host.path_readlink(PREOPEN_FD, b"link").unwrap_err(),
        Errno::Notsup
    );
    assert_eq!(
        f.host
            .path_link(
                PREOPEN_FD,
                Lookupflags::empty(),
                b"a",
                PREOPEN_FD,
                b"b"
            )
            .unwrap_err(),
        Errno::Notsup
    );
}

#[test]
fn random_get_fills_the_buffer() {
    let f = fixture();

    let mut first = [0u8; 16];
    let mut second = [0u8; 16];
    f.host.random_get(&mut first).unwrap();
    f.host.random_get(&mut second).unwrap();

    assert_ne!(first, second);
}

#[test]
fn clocks_are_monotonic() {
    use wasibox_core::wasi_snapshot_preview1::Clockid;

    let f = fixture();

    let first = f
        .host
        .clock_time_get(Clockid::Monotonic, Timestamp(0))
        .unwrap();
    let second = f
        .host
        .clock_time_get(Clockid::Monotonic, Timestamp(0))
        .unwrap();
    assert!(second.0 >= first.0);

    assert!(f.host.clock_res_get(Clockid::Realtime).unwrap().0 > 0);
}

#[test]
fn proc_exit_reports_the_code() {
    let f = fixture();
    assert_eq!(f.host.proc_exit(Exitcode(7)).unwrap_err(), Exitcode(7));
}

#[test]
fn stdin_read_delivers_queued_bytes() {
    let f = fixture();
    f.stdin.push(b"typed input");

    assert_eq!(read_some(&f.host, Fd(0), 64).unwrap(), b"typed input");

    f.stdin.close_input();
    assert_eq!(read_some(&f.host, Fd(0), 64).unwrap(), b"");
}

#[test]
fn cancellation_interrupts_stdin_read_and_flushes_streams() {
    // Scenario: the guest has a writable stream open and blocks reading
    // stdin; the embedder fires the abort signal.
    let f = fixture();

    let out = open(
        &f.host,
        b"pending.log",
        Oflags::CREAT,
        RIGHTS_REGULAR_FILE_BASE,
        Fdflags::empty(),
    )
    .unwrap();
    write_all(&f.host, out, b"buffered line\n").unwrap();

    let firing = f.abort.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        firing.abort();
    });

    assert_eq!(read_some(&f.host, Fd(0), 16).unwrap_err(), Errno::Intr);
    trigger.join().unwrap();

    // Every later syscall observes the abort too.
    assert_eq!(f.host.sched_yield().unwrap_err(), Errno::Intr);

    // Run termination closes all descriptors, publishing the stream.
    f.host.close_all();
    assert_eq!(
        f.volume.read_file(b"/sandbox/pending.log").unwrap(),
        b"buffered line\n"
    );

    assert_eq!(EXITCODE_INTERRUPTED, 130);
}

#[test]
fn poll_oneoff_clock_sleeps_until_deadline() {
    let f = fixture();

    let deadline = Duration::from_millis(25);
    let subscription = Subscription {
        userdata: Userdata(11),
        u: SubscriptionU::Clock(SubscriptionClock {
            id: wasibox_core::wasi_snapshot_preview1::Clockid::Monotonic,
            timeout: Timestamp(deadline.as_nanos() as u64),
            precision: Timestamp(0),
            flags: wasibox_core::wasi_snapshot_preview1::Subclockflags::empty(),
        }),
    };

    let start = Instant::now();
    let events = f.host.poll_oneoff(&[subscription]).unwrap();
    assert!(start.elapsed() >= deadline);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].userdata, Userdata(11));
    assert_eq!(events[0].kind, Eventtype::Clock);
    assert_eq!(events[0].error, Errno::Success);
}

#[test]
fn poll_oneoff_reports_ready_stdin() {
    let f = fixture();
    f.stdin.push(b"xyz");

    let subscription = Subscription {
        userdata: Userdata(5),
        u: SubscriptionU::FdRead(SubscriptionFdReadwrite {
            file_descriptor: Fd(0),
        }),
    };

    let events = f.host.poll_oneoff(&[subscription]).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, Eventtype::FdRead);
    assert_eq!(events[0].fd_readwrite.nbytes, Filesize(3));
}

#[test]
fn poll_oneoff_wakes_when_stdin_arrives() {
    let f = fixture();

    let stdin = f.stdin.clone();
    let feeder = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        stdin.push(b"late");
    });

    let subscription = Subscription {
        userdata: Userdata(5),
        u: SubscriptionU::FdRead(SubscriptionFdReadwrite {
            file_descriptor: Fd(0),
        }),
    };

    let events = f.host.poll_oneoff(&[subscription]).unwrap();
    feeder.join().unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, Eventtype::FdRead);
    assert_eq!(events[0].fd_readwrite.nbytes, Filesize(4));
}

#[test]
fn poll_oneoff_is_interrupted_by_abort() {
    let f = fixture();

    let firing = f.abort.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        firing.abort();
    });

    let subscription = Subscription {
        userdata: Userdata(1),
        u: SubscriptionU::Clock(SubscriptionClock {
            id: wasibox_core::wasi_snapshot_preview1::Clockid::Monotonic,
            timeout: Timestamp(Duration::from_secs(60).as_nanos() as u64),
            precision: Timestamp(0),
            flags: wasibox_core::wasi_snapshot_preview1::Subclockflags::empty(),
        }),
    };

    let start = Instant::now();
    assert_eq!(f.host.poll_oneoff(&[subscription]).unwrap_err(), Errno::Intr);
    assert!(start.elapsed() < Duration::from_secs(60));
    trigger.join().unwrap();
}

#[test]
fn poll_oneoff_rejects_empty_subscriptions() {
    let f = fixture();
    assert_eq!(f.host.poll_oneoff(&[]).unwrap_err(), Errno::Inval);
}

#[test]
fn bad_descriptors_report_badf() {
    let f = fixture();

    assert_eq!(f.host.fd_close(Fd(99)).unwrap_err(), Errno::Badf);
    assert_eq!(f.host.fd_tell(Fd(99)).unwrap_err(), Errno::Badf);
    assert_eq!(read_some(&f.host, Fd(99), 1).unwrap_err(), Errno::Badf);
}
