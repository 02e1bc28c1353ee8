use std::fmt;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::ConfigProvider;
use crate::error::{Result, TransportError};
use crate::region::MappedRegion;

/// Default parent directory of device resources.
pub const DEFAULT_DEVICE_ROOT: &str = "/sys/bus/pci/devices";
/// Default size of each mapped region: 4 KiB.
pub const DEFAULT_REGION_SIZE: usize = 0x1000;
/// Default bound on how long `receive` waits for data.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
/// Size of the length prefix in front of every message.
pub const LENGTH_PREFIX_SIZE: usize = 4;
/// Smallest usable region: a length prefix plus one payload byte.
pub const MIN_REGION_SIZE: usize = LENGTH_PREFIX_SIZE + 1;

/// One half of the duplex channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    /// Resource file backing this direction.
    pub fn resource_name(self) -> &'static str {
        match self {
            Direction::Outbound => "resource0",
            Direction::Inbound => "resource1",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => f.write_str("outbound"),
            Direction::Inbound => f.write_str("inbound"),
        }
    }
}

/// Resource state of one direction.
///
/// Opening happens inside a single call: it either ends `Open` or, on any
/// failure, back in `Closed` with nothing held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Open,
}

/// Configuration for a backbone channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Directory containing one subdirectory per device id.
    pub device_root: PathBuf,
    /// Bytes mapped per direction. Default: 4 KiB.
    pub region_size: usize,
    /// Upper bound on the readiness wait in `receive`. Default: 100 ms.
    pub poll_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
            region_size: DEFAULT_REGION_SIZE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Waits for the inbound resource to become readable.
pub trait ReadinessProbe {
    /// Block for at most `timeout`. Returns `Ok(true)` once data is ready and
    /// `Ok(false)` if the bound elapsed first.
    fn wait_readable(&mut self, fd: BorrowedFd<'_>, timeout: Duration) -> io::Result<bool>;
}

/// Readiness via `poll(2)` on the resource descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollProbe;

impl ReadinessProbe for PollProbe {
    fn wait_readable(&mut self, fd: BorrowedFd<'_>, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeout_ms = remaining.as_millis().min(i32::MAX as u128) as libc::c_int;
            let mut pfd = libc::pollfd {
                fd: fd.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };

            // SAFETY: `pfd` is a single valid pollfd and `fd` is borrowed for
            // the duration of the call.
            let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if rc == 0 {
                return Ok(false);
            }
            if pfd.revents & libc::POLLNVAL != 0 {
                return Err(io::Error::other("poll reported an invalid descriptor"));
            }
            if pfd.revents & libc::POLLIN != 0 {
                return Ok(true);
            }
            if pfd.revents & (libc::POLLERR | libc::POLLHUP) != 0 {
                return Err(io::Error::other(format!(
                    "poll reported error or hangup (revents {:#x})",
                    pfd.revents
                )));
            }
            return Ok(false);
        }
    }
}

/// Simulated duplex hardware link over two memory-mapped regions.
///
/// Each direction is opened lazily on first use and stays open until
/// [`Channel::cleanup`] or drop. Methods take `&mut self`, so one send or
/// receive is in flight per channel at a time.
pub struct Channel<P, R = PollProbe> {
    provider: P,
    config: ChannelConfig,
    probe: R,
    outbound: Option<MappedRegion>,
    inbound: Option<MappedRegion>,
}

impl<P: ConfigProvider> Channel<P> {
    /// Create a channel with default configuration.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, ChannelConfig::default())
    }

    /// Create a channel with explicit configuration.
    pub fn with_config(provider: P, config: ChannelConfig) -> Self {
        Self::with_probe(provider, config, PollProbe)
    }
}

impl<P: ConfigProvider, R: ReadinessProbe> Channel<P, R> {
    /// Create a channel with a custom readiness primitive.
    pub fn with_probe(provider: P, config: ChannelConfig, probe: R) -> Self {
        Self {
            provider,
            config,
            probe,
            outbound: None,
            inbound: None,
        }
    }

    /// Write one framed message to the outbound region.
    ///
    /// Overwrites whatever the region held and flushes it synchronously.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Err(TransportError::EmptyPayload);
        }
        let framed = LENGTH_PREFIX_SIZE + payload.len();
        if framed > self.config.region_size {
            return Err(TransportError::MessageTooLarge {
                size: framed,
                max: self.config.region_size,
            });
        }

        let region = acquire(
            &mut self.outbound,
            &self.provider,
            &self.config,
            Direction::Outbound,
        )?;
        let mem = region.as_mut_slice();
        mem[..LENGTH_PREFIX_SIZE].copy_from_slice(&(payload.len() as u32).to_ne_bytes());
        mem[LENGTH_PREFIX_SIZE..framed].copy_from_slice(payload);
        region.sync(framed).map_err(TransportError::Sync)?;

        debug!(len = payload.len(), "message written to outbound region");
        Ok(())
    }

    /// Wait for and copy one framed message from the inbound region.
    ///
    /// Returns the message length. No terminator is appended to `buf`.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let timeout = self.config.poll_timeout;
        let max = self.config.region_size.saturating_sub(LENGTH_PREFIX_SIZE);

        let region = acquire(
            &mut self.inbound,
            &self.provider,
            &self.config,
            Direction::Inbound,
        )?;
        let ready = self
            .probe
            .wait_readable(region.fd(), timeout)
            .map_err(TransportError::Poll)?;
        if !ready {
            debug!(?timeout, "timed out waiting for inbound data");
            return Err(TransportError::Timeout(timeout));
        }

        let mem = region.as_slice();
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&mem[..LENGTH_PREFIX_SIZE]);
        let len = u32::from_ne_bytes(prefix) as usize;

        if len == 0 || len > max {
            warn!(len, max, "invalid length prefix in inbound region");
            return Err(TransportError::CorruptFrame { len, max });
        }
        if len > buf.len() {
            return Err(TransportError::BufferTooSmall {
                needed: len,
                available: buf.len(),
            });
        }

        buf[..len].copy_from_slice(&mem[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len]);
        debug!(len, "message read from inbound region");
        Ok(len)
    }

    /// Release both directions: unmap, then close. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        for (direction, slot) in [
            (Direction::Outbound, &mut self.outbound),
            (Direction::Inbound, &mut self.inbound),
        ] {
            if let Some(region) = slot.take() {
                drop(region);
                debug!(%direction, "backbone region released");
            }
        }
    }

    /// Current resource state of `direction`.
    pub fn state(&self, direction: Direction) -> ChannelState {
        let slot = match direction {
            Direction::Outbound => &self.outbound,
            Direction::Inbound => &self.inbound,
        };
        if slot.is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    /// Path of the resource backing `direction` for `device_id`.
    pub fn resource_path(&self, device_id: &str, direction: Direction) -> PathBuf {
        resource_path(&self.config, device_id, direction)
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P, R> fmt::Debug for Channel<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("config", &self.config)
            .field("outbound", &self.outbound)
            .field("inbound", &self.inbound)
            .finish_non_exhaustive()
    }
}

fn resource_path(config: &ChannelConfig, device_id: &str, direction: Direction) -> PathBuf {
    config
        .device_root
        .join(device_id)
        .join(direction.resource_name())
}

/// Return the open region in `slot`, opening it first if needed.
fn acquire<'a, P: ConfigProvider>(
    slot: &'a mut Option<MappedRegion>,
    provider: &P,
    config: &ChannelConfig,
    direction: Direction,
) -> Result<&'a mut MappedRegion> {
    match slot {
        Some(region) => Ok(region),
        None => {
            if config.region_size < MIN_REGION_SIZE {
                return Err(TransportError::RegionTooSmall {
                    size: config.region_size,
                    min: MIN_REGION_SIZE,
                });
            }
            let device = provider.resolve()?;
            let path = resource_path(config, &device.device_id, direction);
            debug!(?path, %direction, "opening backbone region");

            let region = MappedRegion::open(&path, config.region_size)?;
            info!(
                ?path,
                %direction,
                device_id = %device.device_id,
                vendor_id = %device.vendor_id,
                subsystem_id = %device.subsystem_id,
                "backbone region opened"
            );
            Ok(slot.insert(region))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::config::StaticConfig;

    const DEVICE: &str = "0000:00:00.0";

    fn unique_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "zonegw-chan-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        fs::create_dir_all(dir.join(DEVICE)).expect("device dir should be creatable");
        dir
    }

    fn create_resource(root: &Path, name: &str, len: u64) {
        let file = fs::File::create(root.join(DEVICE).join(name)).unwrap();
        file.set_len(len).unwrap();
    }

    /// Both directions backed by the same file, so a send is visible to receive.
    fn loopback_root(tag: &str) -> PathBuf {
        let root = unique_root(tag);
        create_resource(&root, "resource0", DEFAULT_REGION_SIZE as u64);
        std::os::unix::fs::symlink(
            root.join(DEVICE).join("resource0"),
            root.join(DEVICE).join("resource1"),
        )
        .unwrap();
        root
    }

    fn channel_at(root: &Path) -> Channel<StaticConfig> {
        let config = ChannelConfig {
            device_root: root.to_path_buf(),
            ..ChannelConfig::default()
        };
        Channel::with_config(StaticConfig::new(DEVICE, "0x1234", "0x5678"), config)
    }

    struct NeverReady {
        calls: usize,
    }

    impl ReadinessProbe for NeverReady {
        fn wait_readable(&mut self, _fd: BorrowedFd<'_>, _timeout: Duration) -> io::Result<bool> {
            self.calls += 1;
            Ok(false)
        }
    }

    #[test]
    fn send_then_receive_over_loopback() {
        let root = loopback_root("loop");
        let mut channel = channel_at(&root);

        channel.send(b"Hello, backbone!").unwrap();
        let mut buf = [0u8; 256];
        let len = channel.receive(&mut buf).unwrap();

        assert_eq!(&buf[..len], b"Hello, backbone!");
        assert_eq!(buf[len], 0);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn directions_open_lazily_and_independently() {
        let root = loopback_root("lazy");
        let mut channel = channel_at(&root);
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Closed);
        assert_eq!(channel.state(Direction::Inbound), ChannelState::Closed);

        channel.send(b"x").unwrap();
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Open);
        assert_eq!(channel.state(Direction::Inbound), ChannelState::Closed);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn largest_message_fits_exactly() {
        let root = loopback_root("max");
        let mut channel = channel_at(&root);
        let max = DEFAULT_REGION_SIZE - LENGTH_PREFIX_SIZE;

        let payload: Vec<u8> = (0..max).map(|i| (i % 253) as u8 + 1).collect();
        channel.send(&payload).unwrap();

        let mut buf = vec![0u8; max];
        let len = channel.receive(&mut buf).unwrap();
        assert_eq!(len, max);
        assert_eq!(buf, payload);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn one_byte_over_is_too_large() {
        let root = loopback_root("over");
        let mut channel = channel_at(&root);

        let err = channel
            .send(&vec![1u8; DEFAULT_REGION_SIZE - LENGTH_PREFIX_SIZE + 1])
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::MessageTooLarge { size, max }
                if size == DEFAULT_REGION_SIZE + 1 && max == DEFAULT_REGION_SIZE
        ));
        assert!(channel.send(&vec![1u8; 2 * DEFAULT_REGION_SIZE]).is_err());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn empty_payload_rejected() {
        let root = loopback_root("empty");
        let mut channel = channel_at(&root);
        assert!(matches!(
            channel.send(b""),
            Err(TransportError::EmptyPayload)
        ));
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Closed);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn receive_times_out_without_fabricating_data() {
        let root = loopback_root("timeout");
        let config = ChannelConfig {
            device_root: root.clone(),
            poll_timeout: Duration::from_millis(5),
            ..ChannelConfig::default()
        };
        let mut channel = Channel::with_probe(
            StaticConfig::new(DEVICE, "0x1234", "0x5678"),
            config,
            NeverReady { calls: 0 },
        );
        channel.send(b"pending").unwrap();

        let mut buf = [0xEEu8; 32];
        let err = channel.receive(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(t) if t == Duration::from_millis(5)));
        assert!(buf.iter().all(|b| *b == 0xEE));
        assert_eq!(channel.probe.calls, 1);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn zero_length_prefix_is_corrupt() {
        let root = loopback_root("zero");
        let mut channel = channel_at(&root);
        let mut buf = [0u8; 16];
        assert!(matches!(
            channel.receive(&mut buf),
            Err(TransportError::CorruptFrame { len: 0, .. })
        ));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn oversized_length_prefix_is_corrupt() {
        let root = loopback_root("huge");
        let mut bytes = vec![0u8; DEFAULT_REGION_SIZE];
        bytes[..4].copy_from_slice(&(DEFAULT_REGION_SIZE as u32).to_ne_bytes());
        fs::write(root.join(DEVICE).join("resource0"), &bytes).unwrap();

        let mut channel = channel_at(&root);
        let mut buf = vec![0u8; DEFAULT_REGION_SIZE * 2];
        assert!(matches!(
            channel.receive(&mut buf),
            Err(TransportError::CorruptFrame { len, .. }) if len == DEFAULT_REGION_SIZE
        ));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn small_buffer_is_rejected() {
        let root = loopback_root("small");
        let mut channel = channel_at(&root);
        channel.send(b"twelve bytes").unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            channel.receive(&mut buf),
            Err(TransportError::BufferTooSmall {
                needed: 12,
                available: 4
            })
        ));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn each_send_overwrites_the_region() {
        let root = loopback_root("overwrite");
        let mut channel = channel_at(&root);
        channel.send(b"first message").unwrap();
        channel.send(b"2nd").unwrap();

        let mut buf = [0u8; 64];
        let len = channel.receive(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"2nd");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn outbound_and_inbound_use_distinct_resources() {
        let root = unique_root("split");
        create_resource(&root, "resource0", DEFAULT_REGION_SIZE as u64);
        create_resource(&root, "resource1", DEFAULT_REGION_SIZE as u64);
        let mut channel = channel_at(&root);

        channel.send(b"to resource0").unwrap();
        let mut buf = [0u8; 64];
        assert!(matches!(
            channel.receive(&mut buf),
            Err(TransportError::CorruptFrame { len: 0, .. })
        ));

        let written = fs::read(root.join(DEVICE).join("resource0")).unwrap();
        assert_eq!(&written[..4], &12u32.to_ne_bytes());
        assert_eq!(&written[4..16], b"to resource0");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_configuration_fails_open() {
        let root = loopback_root("nocfg");
        let config = ChannelConfig {
            device_root: root.clone(),
            ..ChannelConfig::default()
        };
        let provider = StaticConfig {
            subsystem_id: None,
            ..StaticConfig::new(DEVICE, "0x1234", "unused")
        };
        let mut channel = Channel::with_config(provider, config);

        assert!(matches!(
            channel.send(b"x"),
            Err(TransportError::MissingConfig("subsystem_id"))
        ));
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Closed);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_device_is_open_error() {
        let root = unique_root("nodev");
        let mut channel = channel_at(&root);
        let mut buf = [0u8; 8];

        assert!(matches!(
            channel.receive(&mut buf),
            Err(TransportError::Open { .. })
        ));
        assert_eq!(channel.state(Direction::Inbound), ChannelState::Closed);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn map_failure_leaves_closed_and_retries_cleanly() {
        let root = unique_root("short");
        create_resource(&root, "resource0", 100);
        let mut channel = channel_at(&root);

        assert!(matches!(
            channel.send(b"x"),
            Err(TransportError::Map { .. })
        ));
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Closed);

        create_resource(&root, "resource0", DEFAULT_REGION_SIZE as u64);
        channel.send(b"x").unwrap();
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Open);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let root = loopback_root("cleanup");
        let mut channel = channel_at(&root);
        channel.send(b"x").unwrap();
        let mut buf = [0u8; 8];
        channel.receive(&mut buf).unwrap();

        channel.cleanup();
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Closed);
        assert_eq!(channel.state(Direction::Inbound), ChannelState::Closed);
        channel.cleanup();
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Closed);
        assert_eq!(channel.state(Direction::Inbound), ChannelState::Closed);

        channel.send(b"again").unwrap();
        assert_eq!(channel.state(Direction::Outbound), ChannelState::Open);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn resource_paths_follow_device_layout() {
        let channel = Channel::new(StaticConfig::default());
        assert_eq!(
            channel.resource_path("0000:03:00.0", Direction::Outbound),
            PathBuf::from("/sys/bus/pci/devices/0000:03:00.0/resource0")
        );
        assert_eq!(
            channel.resource_path("0000:03:00.0", Direction::Inbound),
            PathBuf::from("/sys/bus/pci/devices/0000:03:00.0/resource1")
        );
    }

    #[test]
    fn undersized_region_is_rejected_before_open() {
        let root = loopback_root("tiny");
        let config = ChannelConfig {
            device_root: root.clone(),
            region_size: 2,
            ..ChannelConfig::default()
        };
        let mut channel =
            Channel::with_config(StaticConfig::new(DEVICE, "0x1234", "0x5678"), config);

        let mut buf = [0u8; 16];
        assert!(matches!(
            channel.receive(&mut buf),
            Err(TransportError::RegionTooSmall { size: 2, min: MIN_REGION_SIZE })
        ));
        assert_eq!(channel.state(Direction::Inbound), ChannelState::Closed);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn smallest_region_carries_one_byte() {
        let root = loopback_root("minregion");
        let config = ChannelConfig {
            device_root: root.clone(),
            region_size: MIN_REGION_SIZE,
            ..ChannelConfig::default()
        };
        let mut channel =
            Channel::with_config(StaticConfig::new(DEVICE, "0x1234", "0x5678"), config);

        channel.send(b"z").unwrap();
        let mut buf = [0u8; 4];
        let len = channel.receive(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"z");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn poll_probe_fails_on_hangup() {
        use std::os::fd::{AsFd, FromRawFd, OwnedFd};

        let mut fds = [0 as libc::c_int; 2];
        // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        // SAFETY: both descriptors were just returned by pipe(2) and are owned here.
        let (read_end, write_end) =
            unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        drop(write_end);

        let mut probe = PollProbe;
        let err = probe
            .wait_readable(read_end.as_fd(), Duration::from_millis(10))
            .unwrap_err();
        assert!(err.to_string().contains("hangup"));
    }

    #[test]
    fn poll_probe_reports_regular_file_ready() {
        let root = loopback_root("poll");
        let file = fs::File::open(root.join(DEVICE).join("resource0")).unwrap();
        let mut probe = PollProbe;
        use std::os::fd::AsFd;
        assert!(probe
            .wait_readable(file.as_fd(), Duration::from_millis(10))
            .unwrap());
        let _ = fs::remove_dir_all(&root);
    }
}
