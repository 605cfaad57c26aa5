#[macro_use]
mod common;

use common::{RAM_FRAMES, Ram, device, page_table};
use kernel_alloc::FrameAlloc;
use kernel_memory_addresses::{FRAME_SIZE, PhysicalAddress, VirtualAddress};
use kernel_vmem::{
    CloneFlags, Features, MapFlags, MapTarget, MemoryType, PageAttrs, PageLevel, PageTable,
    PagingError, Protection, Pte, PteCodec, UnmapFlags,
};

const VA: VirtualAddress = VirtualAddress::new(0x40_0000);

/// 1 GiB-aligned address in the lower half of every format.
const GIB: VirtualAddress = VirtualAddress::new(0x40_0000_0000);

fn map_then_remap_is_already_mapped<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map(VA, MapTarget::Any, 1, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();

    let (pte, level) = pt.lookup(VA).unwrap();
    assert_eq!(level, PageLevel::PAGE);
    assert!(A::is_present(pte));
    let (_, attrs) = pt.translate(VA).unwrap();
    assert_eq!(attrs, PageAttrs::READ_WRITE);
    assert_eq!(attrs.memory_type, MemoryType::NormalWb);

    assert_eq!(
        pt.map(VA, MapTarget::Any, 1, PageAttrs::READ_WRITE, MapFlags::empty()),
        Err(PagingError::AlreadyMapped)
    );
    assert_eq!(pt.virt_to_pte(VA), pte);
}

fn unmap_restores_the_previous_state<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();

    pt.map(VA, MapTarget::Any, 16, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    assert!(frames.free_bytes() < before - 16 * FRAME_SIZE);

    let flush = pt.unmap(VA, 16, UnmapFlags::empty()).unwrap();
    assert_eq!((flush.start(), flush.pages()), (VA, 16));
    flush.ignore();

    assert_eq!(pt.lookup(VA), Err(PagingError::NotMapped));
    assert_eq!(pt.virt_to_pte(VA), Pte::INVALID);
    assert_eq!(frames.free_bytes(), before);
}

fn second_unmap_is_not_mapped<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map_page(VA, MapTarget::Any, PageAttrs::READ_ONLY, MapFlags::empty())
        .unwrap();
    pt.unmap_page(VA, UnmapFlags::empty()).unwrap().ignore();
    assert_eq!(
        pt.unmap_page(VA, UnmapFlags::empty()),
        Err(PagingError::NotMapped)
    );
}

fn translate_adds_the_page_offset<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map_many(VA, device(0x3000), 2, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    let (pa, _) = pt.translate(VA + 0x1234).unwrap();
    assert_eq!(pa, device(0x4234));
}

fn failed_map_changes_nothing<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    // Something already sits in the middle of the requested range.
    pt.map_many(VA + 3 * FRAME_SIZE, device(0), 1, PageAttrs::READ_ONLY, MapFlags::empty())
        .unwrap();
    let before = frames.free_bytes();

    assert_eq!(
        pt.map(VA, MapTarget::Any, 8, PageAttrs::READ_WRITE, MapFlags::empty()),
        Err(PagingError::AlreadyMapped)
    );
    assert_eq!(frames.free_bytes(), before);
    for page in [0, 1, 2, 4, 7] {
        assert_eq!(pt.lookup(VA + page * FRAME_SIZE), Err(PagingError::NotMapped));
    }
    assert_eq!(pt.translate(VA + 3 * FRAME_SIZE).unwrap().0, device(0));
}

fn exhaustion_rolls_back<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();

    assert_eq!(
        pt.map(VA, MapTarget::Any, RAM_FRAMES, PageAttrs::READ_WRITE, MapFlags::empty()),
        Err(PagingError::OutOfMemory)
    );
    assert_eq!(frames.free_bytes(), before);
    assert_eq!(pt.lookup(VA), Err(PagingError::NotMapped));

    // The memory is usable again.
    pt.map(VA, MapTarget::Any, 64, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
}

fn misaligned_requests_are_rejected<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();
    let rw = PageAttrs::READ_WRITE;

    let cases = [
        (VA + 0x123, MapTarget::Any, 1, MapFlags::empty()),
        (VA, MapTarget::Frame(device(0x10)), 1, MapFlags::empty()),
        (VA, MapTarget::Any, 0, MapFlags::empty()),
        (VA, MapTarget::Frame(device(0)), 1, MapFlags::ANY_PADDR),
        (VirtualAddress::new(0x8000_0000_0000_0000), MapTarget::Any, 1, MapFlags::empty()),
    ];
    for (va, target, pages, flags) in cases {
        assert_eq!(pt.map(va, target, pages, rw, flags), Err(PagingError::InvalidArgument));
    }
    assert_eq!(frames.free_bytes(), before);
    assert_eq!(pt.lookup(VA), Err(PagingError::NotMapped));
}

fn unsupported_attributes_are_invalid<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    let write_only = PageAttrs::new(Protection::WRITE);
    assert_eq!(
        pt.map(VA, MapTarget::Any, 1, write_only, MapFlags::empty()),
        Err(PagingError::InvalidArgument)
    );

    pt.map(VA, MapTarget::Any, 1, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    assert_eq!(
        pt.set_attributes(VA, 1, write_only),
        Err(PagingError::InvalidArgument)
    );
}

fn partly_mapped_ranges_are_left_alone<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map(VA, MapTarget::Any, 2, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    let before = frames.free_bytes();

    assert_eq!(
        pt.unmap(VA, 4, UnmapFlags::empty()),
        Err(PagingError::InvalidArgument)
    );
    assert_eq!(
        pt.set_attributes(VA, 4, PageAttrs::READ_ONLY),
        Err(PagingError::InvalidArgument)
    );
    assert_eq!(frames.free_bytes(), before);
    assert_eq!(pt.translate(VA + FRAME_SIZE).unwrap().1, PageAttrs::READ_WRITE);
}

fn aligned_runs_become_one_large_leaf<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let pa = device(0);

    pt.map_many(GIB, pa, 512, PageAttrs::READ_WRITE, MapFlags::LARGE)
        .unwrap();
    assert_eq!(pt.lookup(GIB).unwrap().1, PageLevel::LARGE);
    assert_eq!(pt.lookup(GIB + 511 * FRAME_SIZE).unwrap().1, PageLevel::LARGE);
    assert_eq!(pt.translate(GIB + 0x1_2345).unwrap().0, pa + 0x1_2345);

    // One page off: no large leaf fits anywhere in the run.
    let va = GIB + 0x4000_0000 + FRAME_SIZE;
    pt.map_many(va, pa, 512, PageAttrs::READ_WRITE, MapFlags::LARGE)
        .unwrap();
    for page in 0..512 {
        let (_, level) = pt.lookup(va + page * FRAME_SIZE).unwrap();
        assert_eq!(level, PageLevel::PAGE);
    }
}

fn large_pages_need_the_flag<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map_many(GIB, device(0), 512, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    assert_eq!(pt.lookup(GIB).unwrap().1, PageLevel::PAGE);
}

fn fresh_large_frames_are_aligned<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();

    pt.map(GIB, MapTarget::Any, 512, PageAttrs::READ_WRITE, MapFlags::LARGE)
        .unwrap();
    let (pte, level) = pt.lookup(GIB).unwrap();
    assert_eq!(level, PageLevel::LARGE);
    assert!(A::paddr(pte, level).is_aligned_to(PageLevel::LARGE.size()));

    pt.unmap(GIB, 512, UnmapFlags::empty()).unwrap().ignore();
    assert_eq!(frames.free_bytes(), before);
}

fn large_requests_fall_back_when_no_block_is_free<A: PteCodec>() {
    // Bookkeeping occupies the start of the only 2 MiB-aligned block.
    let ram = Ram::new(600);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map(GIB, MapTarget::Any, 512, PageAttrs::READ_WRITE, MapFlags::LARGE)
        .unwrap();
    assert_eq!(pt.lookup(GIB).unwrap().1, PageLevel::PAGE);
    assert_eq!(pt.lookup(GIB + 511 * FRAME_SIZE).unwrap().1, PageLevel::PAGE);
}

fn restricted_features_make_large_unsupported<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    pt.restrict_features(Features::NO_EXECUTE);

    assert_eq!(
        pt.map_many(GIB, device(0), 512, PageAttrs::READ_WRITE, MapFlags::LARGE),
        Err(PagingError::Unsupported)
    );
    assert!(!pt.features().contains(Features::LARGE_PAGES));
}

fn partial_unmap_splits_large_leaves<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let pa = device(0);

    pt.map_many(GIB, pa, 512, PageAttrs::READ_EXEC, MapFlags::LARGE)
        .unwrap();
    pt.unshare(GIB + FRAME_SIZE, 1).unwrap().ignore();

    assert_eq!(pt.lookup(GIB + FRAME_SIZE), Err(PagingError::NotMapped));
    let (pte, level) = pt.lookup(GIB).unwrap();
    assert_eq!(level, PageLevel::PAGE);
    assert_eq!(A::decode_attrs(pte, level), PageAttrs::READ_EXEC);
    assert_eq!(pt.translate(GIB).unwrap().0, pa);
    assert_eq!(pt.translate(GIB + 2 * FRAME_SIZE).unwrap().0, pa + 2 * FRAME_SIZE);
    assert_eq!(pt.translate(GIB + 511 * FRAME_SIZE).unwrap().0, pa + 511 * FRAME_SIZE);
}

fn kept_frames_can_be_mapped_again<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();

    pt.map_page(VA, MapTarget::Any, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    let mapped = frames.free_bytes();
    let (pa, _) = pt.translate(VA).unwrap();

    // The alias shares the leaf table with the original mapping.
    let alias = VA + FRAME_SIZE;
    pt.map_many(alias, pa, 1, PageAttrs::READ_ONLY, MapFlags::empty())
        .unwrap();
    pt.unmap_page(VA, UnmapFlags::KEEP_FRAMES).unwrap().ignore();
    assert_eq!(frames.free_bytes(), mapped);
    assert_eq!(pt.translate(alias).unwrap().0, pa);

    pt.unmap_page(alias, UnmapFlags::empty()).unwrap().ignore();
    assert_eq!(frames.free_bytes(), before);
}

fn attributes_change_in_place<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map(VA, MapTarget::Any, 4, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    let (pa, _) = pt.translate(VA + FRAME_SIZE).unwrap();

    let flush = pt.set_attributes(VA + FRAME_SIZE, 2, PageAttrs::READ_ONLY).unwrap();
    assert_eq!((flush.start(), flush.pages()), (VA + FRAME_SIZE, 2));
    flush.ignore();

    assert_eq!(pt.translate(VA).unwrap().1, PageAttrs::READ_WRITE);
    assert_eq!(pt.translate(VA + FRAME_SIZE).unwrap(), (pa, PageAttrs::READ_ONLY));
    assert_eq!(pt.translate(VA + 2 * FRAME_SIZE).unwrap().1, PageAttrs::READ_ONLY);
    assert_eq!(pt.translate(VA + 3 * FRAME_SIZE).unwrap().1, PageAttrs::READ_WRITE);

    assert_eq!(
        pt.set_attributes(VA + 0x10_0000, 1, PageAttrs::READ_ONLY),
        Err(PagingError::NotMapped)
    );
}

fn attributes_of_part_of_a_large_leaf<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map_many(GIB, device(0), 512, PageAttrs::READ_WRITE, MapFlags::LARGE)
        .unwrap();
    pt.set_attributes(GIB + 8 * FRAME_SIZE, 8, PageAttrs::READ_ONLY)
        .unwrap()
        .ignore();

    assert_eq!(pt.lookup(GIB).unwrap().1, PageLevel::PAGE);
    assert_eq!(pt.translate(GIB + 7 * FRAME_SIZE).unwrap().1, PageAttrs::READ_WRITE);
    assert_eq!(pt.translate(GIB + 8 * FRAME_SIZE).unwrap().1, PageAttrs::READ_ONLY);
    assert_eq!(pt.translate(GIB + 15 * FRAME_SIZE).unwrap().1, PageAttrs::READ_ONLY);
    assert_eq!(pt.translate(GIB + 16 * FRAME_SIZE).unwrap().1, PageAttrs::READ_WRITE);
}

fn destroy_returns_every_frame<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let before = frames.free_bytes();
    let mut pt = page_table::<A>(&ram, &frames);

    pt.map(VA, MapTarget::Any, 32, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    pt.map(GIB, MapTarget::Any, 512, PageAttrs::READ_WRITE, MapFlags::LARGE)
        .unwrap();
    let device_ro = PageAttrs::MMIO.with_prot(Protection::READ);
    pt.map_many(GIB + 0x4000_0000, device(0), 4, device_ro, MapFlags::empty())
        .unwrap();
    assert!(frames.free_bytes() < before);

    pt.destroy(UnmapFlags::empty());
    assert_eq!(frames.free_bytes(), before);
}

fn tables_outlive_only_their_mappings<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();

    // Two leaves far apart share only the upper tables.
    pt.map_many(VA, device(0), 1, PageAttrs::READ_ONLY, MapFlags::empty())
        .unwrap();
    pt.map_many(GIB, device(0), 1, PageAttrs::READ_ONLY, MapFlags::empty())
        .unwrap();
    let both = frames.free_bytes();

    pt.unshare(GIB, 1).unwrap().ignore();
    assert!(frames.free_bytes() > both);
    assert!(pt.lookup(VA).is_ok());

    pt.unshare(VA, 1).unwrap().ignore();
    assert_eq!(frames.free_bytes(), before);
}

fn root_is_reachable_through_the_direct_map<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let pt = page_table::<A>(&ram, &frames);

    assert!(pt.root().is_aligned_to(FRAME_SIZE));
    assert!(pt.direct_map().covers(pt.root()));
    assert!(ram.range().contains(pt.root()));
    assert_ne!(pt.root(), PhysicalAddress::zero());
}

fn forced_large_leaves_need_aligned_requests<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let rw = PageAttrs::READ_WRITE;

    for (va, pa, pages) in [
        (GIB + FRAME_SIZE, device(0), 512),
        (GIB, device(FRAME_SIZE), 512),
        (GIB, device(0), 513),
        (GIB, device(0), 256),
    ] {
        assert_eq!(
            pt.map_many(va, pa, pages, rw, MapFlags::FORCE_LARGE),
            Err(PagingError::InvalidArgument)
        );
    }
    assert_eq!(
        pt.map_many(GIB, device(0), 512, rw, MapFlags::FORCE_LARGE | MapFlags::FORCE_HUGE),
        Err(PagingError::InvalidArgument)
    );
    assert_eq!(pt.lookup(GIB), Err(PagingError::NotMapped));

    pt.map_many(GIB, device(0), 1024, rw, MapFlags::FORCE_LARGE)
        .unwrap();
    assert_eq!(pt.lookup(GIB).unwrap().1, PageLevel::LARGE);
    assert_eq!(pt.lookup(GIB + 512 * FRAME_SIZE).unwrap().1, PageLevel::LARGE);
    assert_eq!(pt.translate(GIB + 0x20_1234).unwrap().0, device(0x20_1234));
}

fn forced_huge_leaves_cover_a_gigabyte<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();

    pt.map_many(GIB, device(0), 1 << 18, PageAttrs::READ_WRITE, MapFlags::FORCE_HUGE)
        .unwrap();
    let (pte, level) = pt.lookup(GIB + 0x1234_5000).unwrap();
    assert_eq!(level, PageLevel::HUGE);
    assert_eq!(A::paddr(pte, level), device(0));

    pt.unshare(GIB, 1 << 18).unwrap().ignore();
    assert_eq!(frames.free_bytes(), before);
}

fn forced_sizes_never_fall_back<A: PteCodec>() {
    // Bookkeeping occupies the start of the only 2 MiB-aligned block.
    let ram = Ram::new(600);
    let frames = ram.allocator();
    let mut pt = page_table::<A>(&ram, &frames);
    let before = frames.free_bytes();
    let rw = PageAttrs::READ_WRITE;

    assert_eq!(
        pt.map(GIB, MapTarget::Any, 512, rw, MapFlags::FORCE_LARGE),
        Err(PagingError::OutOfMemory)
    );
    assert_eq!(frames.free_bytes(), before);

    // A table where the large leaf would go.
    pt.map_many(GIB + FRAME_SIZE, device(0), 1, rw, MapFlags::empty())
        .unwrap();
    assert_eq!(
        pt.map_many(GIB, device(0), 512, rw, MapFlags::FORCE_LARGE),
        Err(PagingError::AlreadyMapped)
    );
    assert_eq!(pt.lookup(GIB), Err(PagingError::NotMapped));

    pt.restrict_features(Features::LARGE_PAGES | Features::NO_EXECUTE);
    assert_eq!(
        pt.map_many(GIB + 0x4000_0000, device(0), 1 << 18, rw, MapFlags::FORCE_HUGE),
        Err(PagingError::Unsupported)
    );
}

fn clones_share_frames_but_not_tables<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let before = frames.free_bytes();
    let mut src = page_table::<A>(&ram, &frames);

    src.map(VA, MapTarget::Any, 4, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    src.map_many(GIB, device(0), 512, PageAttrs::READ_EXEC, MapFlags::LARGE)
        .unwrap();

    let mut copy = PageTable::clone_from(&src, CloneFlags::empty()).unwrap();
    assert_ne!(copy.root(), src.root());
    for va in [VA, VA + 3 * FRAME_SIZE, GIB, GIB + 0x1234] {
        assert_eq!(copy.translate(va), src.translate(va));
    }
    assert_eq!(copy.lookup(GIB).unwrap().1, PageLevel::LARGE);

    // Each side changes independently.
    let extra = VA + 0x10_0000;
    copy.map_page(extra, MapTarget::Any, PageAttrs::READ_ONLY, MapFlags::empty())
        .unwrap();
    assert_eq!(src.lookup(extra), Err(PagingError::NotMapped));
    src.unshare(GIB, 512).unwrap().ignore();
    assert_eq!(copy.translate(GIB).unwrap().0, device(0));

    copy.unmap_page(extra, UnmapFlags::empty()).unwrap().ignore();
    copy.destroy(UnmapFlags::KEEP_FRAMES);
    assert!(src.translate(VA + 3 * FRAME_SIZE).is_ok());

    src.destroy(UnmapFlags::empty());
    assert_eq!(frames.free_bytes(), before);
}

fn root_only_clones_map_nothing<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut src = page_table::<A>(&ram, &frames);
    src.map(VA, MapTarget::Any, 1, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();
    let with_src = frames.free_bytes();

    let copy = PageTable::clone_from(&src, CloneFlags::ROOT_ONLY).unwrap();
    assert_eq!(frames.free_bytes(), with_src - FRAME_SIZE);
    assert_eq!(copy.lookup(VA), Err(PagingError::NotMapped));

    copy.destroy(UnmapFlags::empty());
    assert_eq!(frames.free_bytes(), with_src);
    assert!(src.translate(VA).is_ok());
}

fn failed_clones_give_their_tables_back<A: PteCodec>() {
    let ram = Ram::new(RAM_FRAMES);
    let frames = ram.allocator();
    let mut src = page_table::<A>(&ram, &frames);
    src.map(VA, MapTarget::Any, 1, PageAttrs::READ_WRITE, MapFlags::empty())
        .unwrap();

    let mut hoard = Vec::new();
    while let Ok(pa) = frames.alloc(1) {
        hoard.push(pa);
    }
    // Room for the new root and one lower table, not the whole path.
    let keep = hoard.len() - 2;
    for pa in hoard.split_off(keep) {
        frames.free(pa, 1).unwrap();
    }

    assert_eq!(
        PageTable::clone_from(&src, CloneFlags::empty()).unwrap_err(),
        PagingError::OutOfMemory
    );
    assert_eq!(frames.free_bytes(), 2 * FRAME_SIZE);
    assert!(src.translate(VA).is_ok());
}

for_each_codec!(
    map_then_remap_is_already_mapped,
    unmap_restores_the_previous_state,
    second_unmap_is_not_mapped,
    translate_adds_the_page_offset,
    failed_map_changes_nothing,
    exhaustion_rolls_back,
    misaligned_requests_are_rejected,
    unsupported_attributes_are_invalid,
    partly_mapped_ranges_are_left_alone,
    aligned_runs_become_one_large_leaf,
    large_pages_need_the_flag,
    fresh_large_frames_are_aligned,
    large_requests_fall_back_when_no_block_is_free,
    restricted_features_make_large_unsupported,
    partial_unmap_splits_large_leaves,
    kept_frames_can_be_mapped_again,
    attributes_change_in_place,
    attributes_of_part_of_a_large_leaf,
    destroy_returns_every_frame,
    tables_outlive_only_their_mappings,
    root_is_reachable_through_the_direct_map,
    forced_large_leaves_need_aligned_requests,
    forced_huge_leaves_cover_a_gigabyte,
    forced_sizes_never_fall_back,
    clones_share_frames_but_not_tables,
    root_only_clones_map_nothing,
    failed_clones_give_their_tables_back,
);
