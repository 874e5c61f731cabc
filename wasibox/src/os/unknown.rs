use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use wasibox_core::wasi_snapshot_preview1::{Clockid, Errno, Timestamp, WasiResult};

pub(crate) fn preview1_clock_res_get(id: Clockid) -> WasiResult<Timestamp> {
    match id {
        Clockid::Realtime | Clockid::Monotonic => Ok(Timestamp(1_000)),
        _ => Err(Errno::Inval),
    }
}

pub(crate) fn preview1_clock_time_get(id: Clockid, _precision: Timestamp) -> WasiResult<Timestamp> {
    match id {
        Clockid::Realtime => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|_| Errno::Io)?;
            Ok(Timestamp(now.as_nanos() as u64))
        }
        Clockid::Monotonic => {
            // Wall clock clamped to be non-decreasing; WASI only requires
            // the monotonic clock to never run backwards.
            static LAST: AtomicU64 = AtomicU64::new(0);

            let wall = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|_| Errno::Io)?
                .as_nanos() as u64;

            let mut stamp = 0;
            LAST.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                stamp = wall.max(last);
                Some(stamp)
            })
            .ok();

            Ok(Timestamp(stamp))
        }
        _ => Err(Errno::Inval),
    }
}
