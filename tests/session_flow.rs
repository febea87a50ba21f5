//! End-to-end sessions against a loopback TCP device emulator

use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use amode_stream::{
    DataMode, DepthCsvSink, FrameTap, NeverCancel, ReadPolicy, SessionConfig, SessionEnd,
    StreamError, StreamingSession, TcpTransport, sink_for,
};

const HEADER: [u8; 4] = [0xA5, 0x5A, 0x00, 0x01];

fn depth_frame(index: u32, probes_x_samples: usize) -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(&f64::from(index).to_le_bytes());
    for i in 0..probes_x_samples {
        let depth = f64::from(index) * 10.0 + i as f64 * 0.25;
        bytes.extend_from_slice(&depth.to_le_bytes());
    }
    bytes
}

fn raw_frame(index: u16, element_count: usize) -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(&index.to_le_bytes());
    for i in 0..element_count {
        bytes.extend_from_slice(&(i as u16 * 100).to_le_bytes());
    }
    bytes
}

/// Device that accepts one client and writes `deliveries` with `pause` between them.
async fn emulator(deliveries: Vec<Vec<u8>>, pause: Duration) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let device = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        for delivery in deliveries {
            if socket.write_all(&delivery).await.is_err() {
                return;
            }
            tokio::time::sleep(pause).await;
        }
        let _ = socket.shutdown().await;
    });

    (address, device)
}

/// Device that streams frames until the client goes away.
async fn endless_emulator(samples: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (mut socket, _): (TcpStream, _) = listener.accept().await.unwrap();
        let mut index = 0u32;
        while socket.write_all(&depth_frame(index, samples)).await.is_ok() {
            index += 1;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    address
}

fn files_with_extension(dir: &Path, extension: &str) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn depth_session_records_csv_rows() {
    let (address, device) =
        emulator((0..5).map(|i| depth_frame(i, 60)).collect(), Duration::from_millis(1)).await;
    let out = tempfile::TempDir::new().unwrap();

    let config = SessionConfig::builder(DataMode::Depth)
        .use_data_index(true)
        .record(true)
        .read_policy(ReadPolicy::Exact)
        .build()
        .unwrap();
    let tap = FrameTap::new();
    let csv = DepthCsvSink::create(out.path(), Some("depth")).unwrap();

    let transport = TcpTransport::connect(&address).await.unwrap();
    let report = StreamingSession::new(transport, config, (csv, tap.clone()), NeverCancel).run().await;
    device.await.unwrap();

    assert!(matches!(report.end, SessionEnd::StreamEnded));
    let stats = report.into_result().unwrap();
    assert_eq!(stats.accepted_frames(), 5);
    assert_eq!(stats.rejected_frames(), 0);
    assert_eq!(stats.index_gaps(), 0);

    let contents = std::fs::read_to_string(out.path().join("depth.csv")).unwrap();
    let rows: Vec<&str> = contents.lines().collect();
    assert_eq!(rows.len(), 5);
    for (i, row) in rows.iter().enumerate() {
        let fields: Vec<&str> = row.trim_end_matches(',').split(',').collect();
        assert_eq!(fields.len(), 2 + 60);
        assert_eq!(fields[1], i.to_string());
        assert_eq!(fields[2].parse::<f64>().unwrap(), i as f64 * 10.0);
    }

    // Tap was closed with the session
    assert!(tap.latest().is_none());
}

#[tokio::test]
async fn raw_session_writes_one_tiff_per_frame() {
    let (samples, probes) = (8usize, 4usize);
    let (address, device) = emulator(
        (10..13).map(|i| raw_frame(i, samples * probes)).collect(),
        Duration::from_millis(1),
    )
    .await;
    let out = tempfile::TempDir::new().unwrap();

    let config = SessionConfig::builder(DataMode::Raw)
        .samples(samples)
        .probes(probes)
        .use_data_index(true)
        .record(true)
        .read_policy(ReadPolicy::Exact)
        .build()
        .unwrap();
    let sink = sink_for(&config, out.path()).unwrap();

    let transport = TcpTransport::connect(&address).await.unwrap();
    let stats = StreamingSession::new(transport, config, sink, NeverCancel).run().await.into_result().unwrap();
    device.await.unwrap();
    assert_eq!(stats.accepted_frames(), 3);

    let images = files_with_extension(out.path(), "tiff");
    assert_eq!(images.len(), 3);
    for (image_path, index) in images.iter().zip(10..13) {
        let name = image_path.file_stem().unwrap().to_str().unwrap();
        assert!(name.ends_with(&format!("_{}", index)), "unexpected file name {}", name);

        let image = image::open(image_path).unwrap().into_luma16();
        assert_eq!(image.dimensions(), (samples as u32, probes as u32));
        assert_eq!(image.get_pixel(1, 0).0[0], 100);
    }
}

#[tokio::test]
async fn single_read_drops_truncated_delivery() {
    let mut truncated = depth_frame(1, 60);
    truncated.truncate(400);
    let (address, device) = emulator(
        vec![depth_frame(0, 60), truncated, depth_frame(2, 60)],
        Duration::from_millis(50),
    )
    .await;

    let config = SessionConfig::builder(DataMode::Depth).use_data_index(true).build().unwrap();
    assert_eq!(config.read_policy(), ReadPolicy::SingleRead);

    let transport = TcpTransport::connect(&address).await.unwrap();
    let stats = StreamingSession::new(transport, config, amode_stream::NullSink, NeverCancel)
        .run()
        .await
        .into_result()
        .unwrap();
    device.await.unwrap();

    assert_eq!(stats.accepted_frames(), 2);
    assert_eq!(stats.rejected_frames(), 1);
    assert_eq!(stats.index_gaps(), 1);
}

#[tokio::test]
async fn independent_sessions_per_device() {
    let first = endless_emulator(60).await;
    let second = endless_emulator(60).await;
    let config = SessionConfig::builder(DataMode::Depth)
        .read_policy(ReadPolicy::Exact)
        .build()
        .unwrap();

    let handles = vec![
        StreamingSession::spawn(
            TcpTransport::connect(&first).await.unwrap(),
            config.clone(),
            amode_stream::NullSink,
        ),
        StreamingSession::spawn(
            TcpTransport::connect(&second).await.unwrap(),
            config,
            amode_stream::NullSink,
        ),
    ];

    tokio::time::sleep(Duration::from_millis(100)).await;
    for handle in &handles {
        handle.cancel();
    }

    for handle in handles {
        let report = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("session should stop after cancel")
            .unwrap();
        assert!(matches!(report.end, SessionEnd::Cancelled));
        assert!(report.stats.accepted_frames() > 0);
    }
}

#[tokio::test]
async fn stalled_device_fails_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let device = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(socket);
    });

    let config = SessionConfig::preset(DataMode::Depth).unwrap();
    let transport = TcpTransport::connect(&address)
        .await
        .unwrap()
        .with_read_timeout(Some(Duration::from_millis(50)));

    let cancel = CancellationToken::new();
    let report = StreamingSession::new(transport, config, amode_stream::NullSink, cancel).run().await;
    device.await.unwrap();

    assert_eq!(report.stats.accepted_frames(), 0);
    match report.into_result() {
        Err(error @ StreamError::Transport { .. }) => {
            assert!(error.is_retryable());
            assert!(error.to_string().contains("no data from device"));
        }
        other => panic!("expected transport failure, got {:?}", other),
    }
}

#[tokio::test]
async fn cancel_during_stalled_read_flushes_recorded_rows() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let device = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        for index in 0..2 {
            socket.write_all(&depth_frame(index, 60)).await.unwrap();
        }
        // Stall with the connection still open
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let out = tempfile::TempDir::new().unwrap();

    let config = SessionConfig::builder(DataMode::Depth)
        .use_data_index(true)
        .record(true)
        .read_policy(ReadPolicy::Exact)
        .build()
        .unwrap();
    let csv = DepthCsvSink::create(out.path(), Some("stalled")).unwrap();

    let cancel = CancellationToken::new();
    let transport = TcpTransport::connect(&address).await.unwrap().with_cancellation(cancel.clone());

    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        stopper.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(2),
        StreamingSession::new(transport, config, csv, cancel).run(),
    )
    .await
    .expect("cancel should interrupt the stalled read");
    device.abort();

    assert!(matches!(report.end, SessionEnd::Cancelled));
    assert_eq!(report.stats.accepted_frames(), 2);

    let contents = std::fs::read_to_string(out.path().join("stalled.csv")).unwrap();
    assert_eq!(contents.lines().count(), 2);
}
