use morning_frame_firmware::base64::{self, Base64Error};
use morning_frame_firmware::refresh::{self, RefreshInputs, RefreshKind};
use morning_frame_firmware::weather::{self, MINUTES_PER_DAY};
use proptest::prelude::*;

proptest! {
    #[test]
    fn minute_distance_stays_on_the_circle(from in 0i16..1440, to in 0u16..1440) {
        let d = weather::minute_distance(from, to);
        prop_assert!((d as i32) < MINUTES_PER_DAY);
        // Going forward from `from` by `d` lands on `to`
        prop_assert_eq!((from as i32 + d as i32) % MINUTES_PER_DAY, to as i32);
    }

    #[test]
    fn fresh_fetch_is_never_stale(minute in 0u16..1440, interval in 1u16..720) {
        prop_assert!(!weather::needs_refresh(minute as i16, minute, false, false, interval));
        let later = (minute + interval) % 1440;
        prop_assert!(weather::needs_refresh(minute as i16, later, false, false, interval));
    }

    #[test]
    fn counter_never_reaches_period(
        counter in 0u16..200,
        period in 1u16..120,
        day_changed: bool,
        foreign_frame: bool,
        weather_just_changed: bool,
        content_changed: bool,
    ) {
        let counter = counter.min(period - 1);
        let kind = refresh::decide(&RefreshInputs {
            day_changed,
            foreign_frame,
            cycles_since_full_refresh: counter,
            refresh_period: period,
            weather_just_changed,
            content_changed,
        });
        let next = refresh::next_counter(kind, counter, period);
        prop_assert!(next < period);
        if kind == RefreshKind::Full {
            prop_assert_eq!(next, 0);
        }
        if day_changed || foreign_frame || weather_just_changed {
            prop_assert_eq!(kind, RefreshKind::Full);
        }
    }

    #[test]
    fn decode_respects_capacity(data in proptest::collection::vec(any::<u8>(), 0..64), cap in 0usize..64) {
        let encoded = encode(&data);
        let mut out = vec![0xAAu8; cap];
        match base64::decode_into(encoded.as_bytes(), &mut out) {
            Ok(n) => {
                prop_assert!(data.len() <= cap);
                prop_assert_eq!(&out[..n], &data[..]);
            }
            Err(Base64Error::TooLarge { needed, capacity }) => {
                prop_assert_eq!(needed, data.len());
                prop_assert_eq!(capacity, cap);
                // Rejected before anything was written
                prop_assert!(out.iter().all(|&b| b == 0xAA));
            }
            Err(e) => prop_assert!(false, "unexpected error {:?}", e),
        }
    }
}

/// Reference encoder for generating inputs
fn encode(data: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::new();
    for chunk in data.chunks(3) {
        let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
        for i in 0..4 {
            if i <= chunk.len() {
                out.push(ALPHABET[(n >> (18 - 6 * i) & 63) as usize] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}
