// Digest, codec and signature benchmarks for the construction hot paths.
//
// Covers transaction decoding, presign digests, the combine path
// (RSV normalisation, splice, origin recovery) and txid hashing.

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use stacks_rosetta::crypto::signatures::{rsv_to_vrs, to_recoverable_rsv};
use stacks_rosetta::crypto::{Secp256k1PrivateKey, Secp256k1PublicKey};
use stacks_rosetta::transaction::{
    presign_digest, splice_origin_signature, verify_origin, MessageSignature, StacksTransaction,
};
use stacks_rosetta::translator;

const UNSIGNED_TRANSFER: &str = "0x80800000000400539886f96611ba3ba6cef9618f8c78118b37c5be000000000000000000000000000000b400000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000003020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";
const SIGNED_TRANSFER: &str = "0x80800000000400539886f96611ba3ba6cef9618f8c78118b37c5be000000000000000000000000000000b400017a33a91515ef48608a99c6adecd2eb258e11534a1acf66348f5678c8e2c8f83d243555ed67a0019d3500df98563ca31321c1a675b43ef79f146e322fe08df75103020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";
const SENDER_PUBKEY: &str = "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51";
const RSV: &str = "7a33a91515ef48608a99c6adecd2eb258e11534a1acf66348f5678c8e2c8f83d243555ed67a0019d3500df98563ca31321c1a675b43ef79f146e322fe08df75101";

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(180));
    group.bench_function("decode_transfer", |b| {
        b.iter(|| StacksTransaction::from_hex(SIGNED_TRANSFER).unwrap());
    });
    group.bench_function("encode_transfer", |b| {
        let tx = StacksTransaction::from_hex(SIGNED_TRANSFER).unwrap();
        b.iter(|| tx.to_bytes().unwrap());
    });
    group.bench_function("decode_base_tx", |b| {
        b.iter(|| translator::decode(SIGNED_TRANSFER).unwrap());
    });
    group.finish();
}

fn bench_digests(c: &mut Criterion) {
    let unsigned = StacksTransaction::from_hex(UNSIGNED_TRANSFER).unwrap();
    let signed = StacksTransaction::from_hex(SIGNED_TRANSFER).unwrap();

    c.bench_function("sighash/presign_digest", |b| {
        b.iter(|| presign_digest(&unsigned).unwrap());
    });
    c.bench_function("sighash/txid", |b| {
        b.iter(|| signed.txid().unwrap());
    });
}

fn bench_combine(c: &mut Criterion) {
    let unsigned = StacksTransaction::from_hex(UNSIGNED_TRANSFER).unwrap();
    let digest = presign_digest(&unsigned).unwrap();
    let public_key = Secp256k1PublicKey::from_hex(SENDER_PUBKEY).unwrap();
    let rsv = hex::decode(RSV).unwrap();

    c.bench_function("combine/normalize_splice_verify", |b| {
        b.iter(|| {
            let rsv = to_recoverable_rsv(&digest, &public_key, &rsv).unwrap();
            let signed = splice_origin_signature(&unsigned, MessageSignature(rsv_to_vrs(&rsv))).unwrap();
            verify_origin(&signed).unwrap()
        });
    });

    c.bench_function("combine/compact_signature", |b| {
        b.iter(|| to_recoverable_rsv(&digest, &public_key, &rsv[..64]).unwrap());
    });
}

fn bench_key_derivation(c: &mut Criterion) {
    let key = Secp256k1PrivateKey::random();
    c.bench_function("keys/public_key_hash160", |b| {
        b.iter(|| key.public_key().hash160());
    });
}

criterion_group!(benches, bench_decode, bench_digests, bench_combine, bench_key_derivation);
criterion_main!(benches);
