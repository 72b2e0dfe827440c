//! Integration tests for the sensor
//!
//! Covers:
//! - Tick pipeline: generator, alert machine, buffer, statistics
//! - Live scheduler cadence and rearming
//! - Blocking readers, interrupts and shutdown
//! - Overflow policies
//! - Attribute transport end to end

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use simtemp_core::{
    Attribute, AttributeError, ConfigError, Mode, OverflowPolicy, ReadError, ReadMode, Readiness,
    SampleFlags, Sensor, SAMPLE_RECORD_SIZE,
};

use common::{collect, Fixture, Scripted, TICK_NS};

#[test]
fn timestamps_follow_the_clock() {
    let fixture = Fixture::ramp(45_000);
    let samples = fixture.steps(5);

    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.timestamp_ns, (i as u64 + 1) * TICK_NS);
        assert!(sample.flags.contains(SampleFlags::NEW_SAMPLE));
    }
    assert_eq!(fixture.sensor.buffered(), 5);
}

#[test]
fn alert_counts_match_crossings() {
    // From 43000, draws map to offsets draw - 1000
    //   +1000 -> 44000, +2000 -> 46000, +1000 -> 47000, -1000 -> 46000 (latched)
    //   -1000 -> 45000 (active), -1000 -> 44000 (cleared), +2000 -> 46000 (raised)
    let sensor = Sensor::builder()
        .start_paused()
        .initial_temp_mc(43_000)
        .random_source(Scripted::new(&[2_000, 3_000, 2_000, 0, 0, 0, 3_000]))
        .build()
        .unwrap();

    let temps: Vec<i32> = (0..7).map(|_| sensor.tick().temp_mc).collect();
    assert_eq!(temps, vec![44_000, 46_000, 47_000, 46_000, 45_000, 44_000, 46_000]);

    let stats = sensor.stats();
    assert_eq!(stats.alerts_total, 2);
    assert_eq!(stats.last_alert_mc, 46_000);
    assert_eq!(stats.samples_total, 7);

    let crossed: Vec<bool> = sensor
        .open(ReadMode::NonBlocking)
        .map(|s| s.flags.is_crossed())
        .collect();
    assert_eq!(crossed, vec![false, true, true, true, true, false, true]);
}

#[test]
fn ramp_wraps_back_to_ambient() {
    let fixture = Fixture::ramp(30_000);
    let temps: Vec<i32> = fixture.steps(18).iter().map(|s| s.temp_mc).collect();

    // 27500 .. 35000 is 16 steps, the next would be 35500 > 30000 + 5000
    assert_eq!(temps[15], 35_000);
    assert_eq!(temps[16], 27_000);
    assert_eq!(temps[17], 27_500);
    assert_eq!(fixture.sensor.stats().alerts_total, 1);
}

#[test]
fn live_sensor_delivers_samples() {
    let sensor = Sensor::builder().sampling_ms(20).seed(1).build().unwrap();
    assert!(sensor.is_running());

    let samples = collect(&sensor, 3, Duration::from_secs(5));
    assert!(samples
        .windows(2)
        .all(|pair| pair[0].timestamp_ns <= pair[1].timestamp_ns));
}

#[test]
fn slowing_the_period_takes_effect_immediately() {
    let sensor = Sensor::builder().sampling_ms(10).seed(1).build().unwrap();
    collect(&sensor, 2, Duration::from_secs(5));

    sensor.set_sampling_ms(500).unwrap();
    let after_change = sensor.stats().samples_total;

    thread::sleep(Duration::from_millis(300));
    // At most one tick that was already in flight when the period changed
    assert!(sensor.stats().samples_total <= after_change + 1);
}

#[test]
fn samples_arrive_at_the_new_period_after_a_change() {
    let sensor = Sensor::builder().sampling_ms(10).seed(1).build().unwrap();
    collect(&sensor, 2, Duration::from_secs(5));

    sensor.set_sampling_ms(500).unwrap();
    let wait = Some(Duration::from_secs(5));
    // Drop anything produced at the old period, including a tick in flight
    while sensor.try_read().is_ok() {}
    sensor.blocking_read(wait).unwrap();

    let mut arrivals = vec![Instant::now()];
    for _ in 0..3 {
        sensor.blocking_read(wait).unwrap();
        arrivals.push(Instant::now());
    }

    for pair in arrivals.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            (Duration::from_millis(400)..=Duration::from_millis(800)).contains(&gap),
            "gap {:?} outside 400..=800 ms",
            gap
        );
    }
}

#[test]
fn speeding_up_does_not_wait_out_the_old_period() {
    let sensor = Sensor::builder().sampling_ms(10_000).seed(1).build().unwrap();
    sensor.set_sampling_ms(20).unwrap();

    let started = Instant::now();
    collect(&sensor, 3, Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn each_sample_goes_to_one_reader() {
    let fixture = Fixture::ramp(100_000);
    let first = fixture.sensor.open(ReadMode::NonBlocking);
    let second = fixture.sensor.open(ReadMode::NonBlocking);

    fixture.steps(4);
    let mut seen = vec![
        first.read().unwrap().temp_mc,
        second.read().unwrap().temp_mc,
        first.read().unwrap().temp_mc,
        second.read().unwrap().temp_mc,
    ];
    assert_eq!(first.read(), Err(ReadError::WouldBlock));

    seen.sort_unstable();
    assert_eq!(seen, vec![27_500, 28_000, 28_500, 29_000]);
}

#[test]
fn blocked_readers_wake_on_shutdown() {
    let sensor = Arc::new(
        Sensor::builder()
            .start_paused()
            .seed(5)
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let reader = sensor.open(ReadMode::Blocking);
            thread::spawn(move || reader.read())
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    sensor.shutdown();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Err(ReadError::Closed));
    }
}

#[test]
fn no_tick_after_shutdown() {
    let sensor = Sensor::builder().sampling_ms(10).seed(2).build().unwrap();
    collect(&sensor, 2, Duration::from_secs(5));

    sensor.shutdown();
    assert!(!sensor.is_running());
    let updates = sensor.stats().samples_total;

    thread::sleep(Duration::from_millis(50));
    assert_eq!(sensor.stats().samples_total, updates);
}

#[test]
fn interrupted_reader_can_read_again() {
    let fixture = Fixture::ramp(45_000);
    let reader = fixture.sensor.open(ReadMode::Blocking);
    let interrupter = reader.interrupter();

    let handle = thread::spawn(move || {
        let first = reader.read();
        let second = reader.read_timeout(Duration::from_secs(5));
        (first, second)
    });

    thread::sleep(Duration::from_millis(30));
    interrupter.interrupt();
    thread::sleep(Duration::from_millis(30));
    let produced = fixture.step();

    let (first, second) = handle.join().unwrap();
    assert_eq!(first, Err(ReadError::Interrupted));
    assert_eq!(second, Ok(produced));
}

#[test]
fn poll_wakes_when_a_sample_arrives() {
    let fixture = Arc::new(Fixture::ramp(45_000));
    let reader = fixture.sensor.open(ReadMode::NonBlocking);
    assert_eq!(reader.poll(Some(Duration::from_millis(10))), Readiness::TimedOut);

    let producer = Arc::clone(&fixture);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        producer.step();
    });

    assert_eq!(reader.poll(Some(Duration::from_secs(5))), Readiness::Readable);
    handle.join().unwrap();
    assert!(fixture.sensor.wait_readable(Duration::ZERO));
}

#[test]
fn full_buffer_drops_newest_by_default() {
    let fixture = Fixture::ramp(100_000);
    fixture.steps(64);
    assert_eq!(fixture.sensor.buffered(), 63);
    assert_eq!(fixture.sensor.stats().dropped_total, 1);

    let temps: Vec<i32> = fixture
        .sensor
        .snapshot(simtemp_core::Traversal::Logical)
        .iter()
        .map(|s| s.temp_mc)
        .collect();
    assert_eq!(temps.first(), Some(&27_500));
    assert_eq!(temps.last(), Some(&(27_000 + 63 * 500)));
}

#[test]
fn drop_oldest_policy_can_be_switched_live() {
    let fixture = Fixture::ramp(100_000);
    fixture.steps(63);
    fixture.sensor.set_overflow_policy(OverflowPolicy::DropOldest);
    fixture.steps(2);

    assert_eq!(fixture.sensor.buffered(), 63);
    assert_eq!(fixture.sensor.stats().dropped_total, 2);
    assert_eq!(fixture.sensor.try_read().unwrap().temp_mc, 27_000 + 3 * 500);
}

#[test]
fn draining_a_full_buffer_resumes_storage() {
    let fixture = Fixture::ramp(100_000);
    fixture.steps(70);
    while fixture.sensor.try_read().is_ok() {}

    let sample = fixture.step();
    assert_eq!(fixture.sensor.try_read(), Ok(sample));
}

#[test]
fn binary_records_round_trip_through_reader() {
    let fixture = Fixture::ramp(27_500);
    let produced = fixture.step();
    let reader = fixture.sensor.open(ReadMode::NonBlocking);

    let mut record = [0u8; SAMPLE_RECORD_SIZE];
    assert_eq!(reader.read_into(&mut record), Ok(SAMPLE_RECORD_SIZE));
    assert_eq!(&record[0..8], &TICK_NS.to_le_bytes());
    assert_eq!(&record[8..12], &27_500i32.to_le_bytes());
    assert_eq!(&record[12..16], &0x03u32.to_le_bytes());
    assert_eq!(simtemp_core::Sample::from_bytes(&record), Some(produced));
}

#[test]
fn attributes_drive_the_control_surface() {
    let fixture = Fixture::ramp(45_000);
    let attrs = fixture.sensor.attributes();

    attrs.store(Attribute::ThresholdMc, "28000\n").unwrap();
    attrs.store(Attribute::Mode, "ramp").unwrap();
    fixture.steps(2);

    assert_eq!(attrs.show(Attribute::Stats), "updates = 2\talerts = 1\tlasterr = 28000\n");
    assert_eq!(attrs.show_named("threshold_mC").unwrap(), "28000\n");
    assert_eq!(
        attrs.store_named("stats", "1"),
        Err(AttributeError::ReadOnly { attribute: "stats" })
    );
    assert_eq!(
        attrs.store(Attribute::SamplingMs, "9"),
        Err(AttributeError::Config(ConfigError::InvalidRange {
            field: "sampling_ms",
            value: 9,
            min: 10,
            max: 10_000,
        }))
    );
}

#[test]
fn concurrent_control_and_ticks_stay_consistent() {
    let sensor = Arc::new(Sensor::builder().sampling_ms(10).seed(8).build().unwrap());

    let writer = {
        let sensor = Arc::clone(&sensor);
        thread::spawn(move || {
            for i in 0..50 {
                let threshold = if i % 2 == 0 { 30_000 } else { 40_000 };
                sensor.set_threshold_mc(threshold).unwrap();
                sensor.set_mode(Mode::ALL[i % 3]);
                sensor.set_sampling_ms(10 + (i as u32 % 5)).unwrap();
            }
        })
    };

    let samples = collect(&sensor, 5, Duration::from_secs(5));
    writer.join().unwrap();

    assert_eq!(samples.len(), 5);
    let stats = sensor.stats();
    assert!(stats.samples_total >= 5);
    assert!(stats.alerts_total <= stats.samples_total);
}
