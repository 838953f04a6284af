use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ebyte_rs::e22::{decode_message, encode_set_request, parse_response, RegisterBank};

fn benchmark_encode_set_request(c: &mut Criterion) {
    let mut bank = RegisterBank::from_values([0x01, 0x02, 0x62, 0x00, 0x12, 0x83, 0x00, 0x00]);
    bank.crypt_high.set_value(0x12);

    c.bench_function("encode_set_request", |b| {
        b.iter(|| black_box(encode_set_request(black_box(&bank), false)))
    });
}

fn benchmark_parse_response(c: &mut Criterion) {
    let data = [0xC1, 0x00, 0x06, 0x01, 0x02, 0x62, 0x00, 0x12, 0x83];

    c.bench_function("parse_response", |b| {
        b.iter(|| {
            let result = parse_response(black_box(&data));
            let _ = black_box(result);
        })
    });

    c.bench_function("parse_and_apply", |b| {
        b.iter(|| {
            let mut bank = RegisterBank::default();
            if let Ok(response) = parse_response(black_box(&data)) {
                let _ = response.apply_to(&mut bank);
            }
            black_box(bank)
        })
    });
}

fn benchmark_decode_message(c: &mut Criterion) {
    let mut packet = vec![0x5A; 199];
    packet.push(0xC8);

    c.bench_function("decode_message_rssi", |b| {
        b.iter(|| {
            let _ = black_box(decode_message(black_box(&packet), true));
        })
    });
}

criterion_group!(
    benches,
    benchmark_encode_set_request,
    benchmark_parse_response,
    benchmark_decode_message
);
criterion_main!(benches);
