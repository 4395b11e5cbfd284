use fsolink::fec::{FecCodec, LdpcCodec, LdpcConfig, RsCodec, RsConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn rs_255_223_corrects_sixteen_symbol_errors() {
    init_logging();
    let mut rs = RsCodec::new(
        255,
        223,
        RsConfig {
            fcr: 1,
            symbol_size: 8,
            primitive_poly: 0x11d,
        },
    )
    .unwrap();

    let data: Vec<u8> = (0..223).map(|i| i as u8).collect();
    let mut received = rs.encode(&data).unwrap();

    // Corrupt 16 distinct symbol positions with arbitrary bit flips.
    let positions = [0, 7, 21, 40, 59, 83, 100, 121, 140, 160, 181, 199, 210, 230, 244, 254];
    for (i, &pos) in positions.iter().enumerate() {
        received[pos] ^= 1 << (i % 8);
    }

    let (decoded, stats) = rs.decode(&received).unwrap();
    assert_eq!(decoded, data);
    assert_eq!(stats.corrected, 16);
    assert!(!stats.uncorrectable);
}

#[test]
fn rs_255_223_flags_seventeen_symbol_errors() {
    init_logging();
    let mut rs = RsCodec::new(255, 223, RsConfig::default()).unwrap();
    let data: Vec<u8> = (0..223).map(|i| i as u8).collect();
    let mut received = rs.encode(&data).unwrap();
    for i in 0..17 {
        received[i * 15] ^= 0xa5;
    }
    let (decoded, stats) = rs.decode(&received).unwrap();
    assert!(stats.uncorrectable);
    assert_eq!(decoded.len(), 223);
}

#[test]
fn ldpc_1024_512_clean_decode() {
    init_logging();
    let mut ldpc = LdpcCodec::new(1024, 512, LdpcConfig::default()).unwrap();

    let zeros = vec![0u8; 512];
    let codeword = ldpc.encode(&zeros).unwrap();
    assert!(ldpc.parity_check(&codeword).unwrap());
    assert!(codeword.iter().all(|&b| b == 0));

    let (decoded, report) = ldpc.decode(&codeword).unwrap();
    assert_eq!(decoded, zeros);
    assert!(report.converged);
    assert!(report.iterations <= 1);
}

#[test]
fn ldpc_1024_512_random_data_satisfies_parity() {
    init_logging();
    let ldpc = LdpcCodec::new(1024, 512, LdpcConfig::default()).unwrap();
    // A fixed pseudo-random pattern; any info word must encode to a
    // valid codeword.
    let data: Vec<u8> = (0..512u32)
        .map(|i| (i.wrapping_mul(2654435761) >> 31) as u8 & 1)
        .collect();
    let codeword = ldpc.encode(&data).unwrap();
    assert_eq!(&codeword[..512], data.as_slice());
    assert!(ldpc.parity_check(&codeword).unwrap());
}

#[test]
fn ldpc_1024_512_corrects_sparse_bit_errors() {
    init_logging();
    let mut ldpc = LdpcCodec::new(1024, 512, LdpcConfig::default()).unwrap();
    let data: Vec<u8> = (0..512).map(|i| ((i * 7) % 3 == 0) as u8).collect();
    let mut received = ldpc.encode(&data).unwrap();
    for pos in [12usize, 300, 601, 888, 1020] {
        received[pos] ^= 1;
    }
    let (decoded, report) = ldpc.decode(&received).unwrap();
    assert!(report.converged, "BP did not converge");
    assert_eq!(decoded, data);
}

#[test]
fn facade_dispatch_matches_direct_codecs() {
    init_logging();
    let mut facade = FecCodec::reed_solomon(255, 223, RsConfig::default()).unwrap();
    let data: Vec<u8> = (0..223).map(|i| (255 - i) as u8).collect();
    let mut block = facade.encode(&data).unwrap();
    block[100] ^= 0x0f;
    block[200] ^= 0xf0;
    let (decoded, stats) = facade.decode(&block).unwrap();
    assert_eq!(decoded, data);
    assert_eq!(stats.corrected, 2);
    assert!(!stats.uncorrectable);
}
