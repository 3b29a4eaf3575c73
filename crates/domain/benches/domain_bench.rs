use chrono::{NaiveDate, TimeDelta, Utc};
use common::{RoomId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Booking, Money, Quote, StaySpan, find_conflicts};

fn make_bookings(room_id: RoomId, count: u32) -> Vec<Booking> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    (0..count)
        .map(|i| {
            // Back-to-back two-night stays, so nothing overlaps.
            let check_in = start + TimeDelta::days(i as i64 * 2);
            let span = StaySpan::new(check_in, check_in + TimeDelta::days(2)).unwrap();
            Booking::confirmed(
                UserId::new(),
                room_id,
                span,
                Money::from_dollars(200),
                Utc::now(),
            )
        })
        .collect()
}

fn bench_conflict_scan(c: &mut Criterion) {
    let room_id = RoomId::new();
    let bookings = make_bookings(room_id, 1000);
    let probe = StaySpan::new(
        NaiveDate::from_ymd_opt(2028, 6, 1).unwrap(),
        NaiveDate::from_ymd_opt(2028, 6, 5).unwrap(),
    )
    .unwrap();

    c.bench_function("domain/find_conflicts_1000", |b| {
        b.iter(|| find_conflicts(std::hint::black_box(&bookings), &probe, None));
    });
}

fn bench_quote(c: &mut Criterion) {
    let span = StaySpan::new(
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
    )
    .unwrap();
    let rate = Money::from_dollars(140);

    c.bench_function("domain/quote", |b| {
        b.iter(|| Quote::for_stay(std::hint::black_box(rate), &span));
    });
}

criterion_group!(benches, bench_conflict_scan, bench_quote);
criterion_main!(benches);
