use memcall::{page_size, round_to_pages, Region};

#[test]
fn test_map_is_page_rounded_and_zeroed() {
    let region = Region::map(32).expect("Failed to map region");

    assert_eq!(region.len(), page_size(), "region should cover one page");
    assert!(region.as_bytes().iter().all(|&b| b == 0), "mapped memory not zeroed");

    region.unmap().expect("Failed to unmap region");
}

#[test]
fn test_cycle() {
    let mut region = Region::map(64).expect("Failed to map region");
    let addr = region.as_ptr();

    region.lock().expect("Failed to lock region");
    assert!(region.is_locked());

    for byte in region.as_bytes_mut().iter_mut() {
        *byte = 1;
    }
    assert!(region.as_bytes().iter().all(|&b| b == 1));
    assert_eq!(region.as_ptr(), addr, "region moved while mapped");

    region.unlock().expect("Failed to unlock region");
    assert!(!region.is_locked());
    region.unmap().expect("Failed to unmap region");
}

#[test]
fn test_wipe_clears_whole_mapping() {
    let mut region = Region::map(page_size() + 1).expect("Failed to map region");
    assert_eq!(region.len(), page_size() * 2);

    region.as_bytes_mut().fill(0xAA);
    region.wipe();

    assert!(region.as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn test_empty_map_is_rejected() {
    assert!(Region::map(0).is_err());
}

#[test]
fn test_round_to_pages() {
    let page = page_size();
    assert_eq!(round_to_pages(1), Some(page));
    assert_eq!(round_to_pages(page), Some(page));
    assert_eq!(round_to_pages(page + 1), Some(page * 2));
    assert_eq!(round_to_pages(usize::MAX), None);
}

#[test]
fn test_disable_core_dumps() {
    memcall::disable_core_dumps().expect("Failed to disable core dumps");
}
